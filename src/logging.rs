//! Logging setup for job entry points.
//!
//! Verbosity maps 0 to warnings, 1 to info and 2 or more to debug. Output
//! goes to stderr or to a named file inside the log directory, which comes
//! from the `INHS_LOGDIR` environment variable or, failing that, the
//! `[general] log_dir` configuration key.

use crate::config::{ConfigStore, ConfigValue};
use crate::constants::{
    GENERAL_SECTION, LOG_DIR_ENV_VAR, LOG_DIR_KEY, LOG_TIMESTAMP_FORMAT, STDERR_LOG_TARGET,
};
use crate::{Error, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing::debug;

/// Where log lines are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// File name inside the resolved log directory
    File(String),
}

impl From<&str> for LogTarget {
    fn from(name: &str) -> Self {
        if name == STDERR_LOG_TARGET {
            Self::Stderr
        } else {
            Self::File(name.to_string())
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingOptions {
    pub verbosity: u8,
    pub quiet: bool,
    pub target: LogTarget,
    /// Append to an existing log file instead of truncating it
    pub append: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            verbosity: 0,
            quiet: false,
            target: LogTarget::Stderr,
            append: true,
        }
    }
}

impl LoggingOptions {
    /// Filter level for these options
    pub fn level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbosity {
                0 => "warn",
                1 => "info",
                _ => "debug",
            }
        }
    }
}

/// Pick the log directory: environment override first, then configuration
pub fn resolve_log_dir(env_override: Option<String>, config: Option<&ConfigStore>) -> Result<PathBuf> {
    if let Some(dir) = env_override.filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }

    let configured = config
        .filter(|c| c.contains(GENERAL_SECTION, LOG_DIR_KEY))
        .and_then(|c| c.get(GENERAL_SECTION, LOG_DIR_KEY).ok());

    match configured {
        Some(ConfigValue::Text(dir)) => Ok(PathBuf::from(dir)),
        Some(other) => Err(Error::configuration(format!(
            "[{}]{} must be a directory path, found {} '{}'",
            GENERAL_SECTION,
            LOG_DIR_KEY,
            other.kind(),
            other
        ))),
        None => Err(Error::configuration(format!(
            "Neither env var {} nor config [{}]{} defined - can't continue",
            LOG_DIR_ENV_VAR, GENERAL_SECTION, LOG_DIR_KEY
        ))),
    }
}

/// Install the global subscriber; returns the log file path, if any
pub fn configure_logging(options: &LoggingOptions, config: Option<&ConfigStore>) -> Result<Option<PathBuf>> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = options.level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pheme_util={}", log_level)));
    let timer = fmt::time::ChronoLocal::new(LOG_TIMESTAMP_FORMAT.to_string());

    let log_file = match &options.target {
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_level(true)
                        .with_timer(timer)
                        .with_writer(std::io::stderr),
                )
                .try_init()
                .map_err(|e| Error::configuration(format!("Logging already initialised: {}", e)))?;
            None
        }
        LogTarget::File(name) => {
            let dir = resolve_log_dir(std::env::var(LOG_DIR_ENV_VAR).ok(), config)?;
            let path = dir.join(name);

            let mut open = OpenOptions::new();
            open.create(true);
            if options.append {
                open.append(true);
            } else {
                open.write(true).truncate(true);
            }
            let file = open
                .open(&path)
                .map_err(|e| Error::io(format!("Failed to open log file {}", path.display()), e))?;

            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_level(true)
                        .with_ansi(false)
                        .with_timer(timer)
                        .with_writer(std::sync::Mutex::new(file)),
                )
                .try_init()
                .map_err(|e| Error::configuration(format!("Logging already initialised: {}", e)))?;
            Some(path)
        }
    };

    debug!("Logging initialized at level: {}", log_level);
    Ok(log_file)
}
