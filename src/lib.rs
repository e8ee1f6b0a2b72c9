//! Pheme utility library
//!
//! Operational helpers shared by the cron-driven batch jobs of the Pheme
//! health-data pipeline.
//!
//! This library provides tools for:
//! - Reading layered INI configuration files with typed value coercion
//! - Persisting a date cursor between invocations of a recurring job
//! - Serialising access to a named resource across processes and threads
//! - Configuring structured logging to stderr or a log directory
//! - Small date, path and process helpers used by the job scripts

pub mod config;
pub mod constants;
pub mod datefile;
pub mod lock;
pub mod logging;
pub mod util;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::{ConfigStore, ConfigValue};
pub use datefile::{DateCursor, Direction};
pub use lock::{Lock, LockGuard};

use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for the utility library
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for configuration, date cursor, locking and helper operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Requested section/key is absent and no default was supplied
    #[error("'[{section}]{key}' not in config file(s): {{'{}'}}", join_paths(.sources))]
    MissingKey {
        section: String,
        key: String,
        sources: Vec<PathBuf>,
    },

    /// Malformed INI content
    #[error("Config syntax error in '{}' line {line}: {message}", .path.display())]
    ConfigSyntax {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Persisted date could not be parsed
    #[error("Date parsing error in '{}': '{value}'", .path.display())]
    DateParsing {
        path: PathBuf,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// Free-form date string could not be turned into a date
    #[error("Couldn't create a date from '{value}': {reason}")]
    InvalidDate { value: String, reason: String },

    /// Date arithmetic left the representable range
    #[error("Date out of range: {date} shifted by {days} days")]
    DateOutOfRange { date: NaiveDate, days: i64 },

    /// Lock could not be acquired before the timeout elapsed
    #[error("Timed out after {waited:?} waiting for lock '{}'", .path.display())]
    LockTimeout { path: PathBuf, waited: Duration },

    /// Shell command failed or wrote to stderr
    #[error("Failed execution of '{command}' (status: {status}): {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a missing key error listing the sources consulted
    pub fn missing_key(
        section: impl Into<String>,
        key: impl Into<String>,
        sources: &[PathBuf],
    ) -> Self {
        Self::MissingKey {
            section: section.into(),
            key: key.into(),
            sources: sources.to_vec(),
        }
    }

    /// Create a config syntax error
    pub fn config_syntax(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::ConfigSyntax {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a persisted date parsing error
    pub fn date_parsing(
        path: impl Into<PathBuf>,
        value: impl Into<String>,
        source: chrono::ParseError,
    ) -> Self {
        Self::DateParsing {
            path: path.into(),
            value: value.into(),
            source,
        }
    }

    /// Create an invalid date error
    pub fn invalid_date(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDate {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a date out of range error
    pub fn date_out_of_range(date: NaiveDate, days: i64) -> Self {
        Self::DateOutOfRange { date, days }
    }

    /// Create a lock timeout error
    pub fn lock_timeout(path: impl Into<PathBuf>, waited: Duration) -> Self {
        Self::LockTimeout {
            path: path.into(),
            waited,
        }
    }

    /// Create a command failure error
    pub fn command_failed(
        command: impl Into<String>,
        status: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            status: status.into(),
            stderr: stderr.into(),
        }
    }

    /// True for conditions a caller may reasonably retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

// Automatic conversions from common error types
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}
