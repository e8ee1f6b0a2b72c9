//! Command-line argument definitions for the Pheme utilities
//!
//! This module defines the CLI surface cron jobs and shell scripts use to
//! read configuration, drive a date cursor and guard work with a lock.

use crate::constants::{DEFAULT_LOCK_DIR, DEFAULT_LOCK_NAME, STDERR_LOG_TARGET};
use crate::datefile::Direction;
use crate::logging::{LogTarget, LoggingOptions};
use crate::util::parse_date;
use crate::{Error, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments for the Pheme utilities
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pheme-util",
    version,
    about = "Configuration, date cursor and locking helpers for Pheme batch jobs",
    long_about = "Operational helpers for cron-driven health-data jobs. Reads layered INI \
                  configuration (pheme.conf, /etc/pheme/pheme.conf, ~/.pheme.conf), keeps a \
                  persisted date cursor between runs, and serialises work behind a named lock."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase logging verbosity (-v: info, -vv: debug)"
    )]
    pub verbose: u8,

    /// Only show errors
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        conflicts_with = "verbose",
        help = "Suppress logging except errors"
    )]
    pub quiet: bool,

    /// Log file name inside the log directory, or `stderr`
    ///
    /// The log directory is taken from INHS_LOGDIR, else from `[general] log_dir`.
    #[arg(
        long = "log-file",
        value_name = "NAME",
        default_value = STDERR_LOG_TARGET,
        global = true
    )]
    pub log_file: String,

    /// Truncate the log file instead of appending
    #[arg(long = "truncate-log", global = true)]
    pub truncate_log: bool,

    /// Configuration files, lowest priority first
    ///
    /// Replaces the default candidate list when given.
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config_files: Vec<PathBuf>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Inspect merged configuration values
    Config(ConfigArgs),
    /// Read or advance a persisted date cursor
    Date(DateArgs),
    /// Inspect, break or run under a named lock
    Lock(LockArgs),
}

#[derive(Debug, Clone, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Print the coerced value of SECTION/KEY
    Get {
        section: String,
        key: String,
        /// Printed verbatim when the key is absent
        #[arg(long)]
        default: Option<String>,
    },
    /// Print every merged section and key
    Dump,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateAction {
    /// Print the current date
    Show,
    /// Print the inclusive start and end dates
    Range,
    /// Advance the cursor and print the persisted date
    Bump,
}

/// Arguments for the date cursor command
#[derive(Debug, Clone, Parser)]
pub struct DateArgs {
    #[arg(value_enum)]
    pub action: DateAction,

    /// Date used until one is persisted (YYYY-MM-DD or YYYYMMDD); defaults to today
    #[arg(long, value_name = "DATE", value_parser = parse_date_arg)]
    pub initial: Option<NaiveDate>,

    /// File that keeps the date between runs
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// forwards or backwards; omit to never persist
    #[arg(long, value_name = "DIRECTION")]
    pub direction: Option<Direction>,

    /// Days per step
    #[arg(long, value_name = "DAYS")]
    pub step: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LockAction {
    /// Report whether the lock is held and by whom
    Status,
    /// Forcibly clear the lock
    Break,
    /// Hold the lock while running the trailing command
    Run,
}

/// Arguments for the lock command
#[derive(Debug, Clone, Parser)]
pub struct LockArgs {
    #[arg(value_enum)]
    pub action: LockAction,

    /// Lock file name
    #[arg(long, default_value = DEFAULT_LOCK_NAME)]
    pub name: String,

    /// Directory holding lock files
    #[arg(long = "lock-dir", value_name = "DIR", default_value = DEFAULT_LOCK_DIR)]
    pub lock_dir: PathBuf,

    /// Seconds to wait for the lock; waits forever when omitted
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Shell command run under the lock (after `--`)
    ///
    /// The words are joined with spaces into one `sh -c` string, so quote
    /// the whole command to keep shell quoting intact.
    #[arg(last = true, value_name = "CMD")]
    pub command: Vec<String>,
}

fn parse_date_arg(value: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(value).map_err(|e| e.to_string())
}

impl Args {
    /// Logging options implied by the global flags
    pub fn logging_options(&self) -> LoggingOptions {
        LoggingOptions {
            verbosity: self.verbose,
            quiet: self.quiet,
            target: LogTarget::from(self.log_file.as_str()),
            append: !self.truncate_log,
        }
    }
}

impl LockArgs {
    /// Validate the lock arguments for consistency
    pub fn validate(&self) -> Result<()> {
        if let Some(timeout) = self.timeout {
            if !timeout.is_finite() || timeout < 0.0 {
                return Err(Error::configuration(format!(
                    "Lock timeout must be a non-negative number of seconds, got {}",
                    timeout
                )));
            }
        }

        match self.action {
            LockAction::Run if self.command.is_empty() => Err(Error::configuration(
                "lock run needs a command after `--`",
            )),
            LockAction::Status | LockAction::Break if !self.command.is_empty() => {
                Err(Error::configuration(format!(
                    "lock {:?} takes no command",
                    self.action
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs_f64)
    }
}
