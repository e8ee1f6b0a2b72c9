//! Application constants for the Pheme utilities
//!
//! This module contains default file locations, formats, environment
//! variable names and thresholds used throughout the crate.

// =============================================================================
// Configuration Files
// =============================================================================

/// Project-local configuration file, relative to the working directory
pub const LOCAL_CONFIG_FILE: &str = "pheme.conf";

/// System-wide configuration file
pub const SYSTEM_CONFIG_FILE: &str = "/etc/pheme/pheme.conf";

/// Per-user configuration file, relative to the home directory
pub const USER_CONFIG_FILE_NAME: &str = ".pheme.conf";

/// Section whose keys are visible from every other section
pub const DEFAULT_SECTION: &str = "DEFAULT";

/// Section holding installation-wide settings
pub const GENERAL_SECTION: &str = "general";

/// `[general]` key naming the log directory
pub const LOG_DIR_KEY: &str = "log_dir";

/// `[general]` key flagging a production installation
pub const IN_PRODUCTION_KEY: &str = "in_production";

// =============================================================================
// Date Cursor
// =============================================================================

/// Format of the single line stored in a date persistence file
pub const PERSISTED_DATE_FORMAT: &str = "%Y-%m-%d";

/// Step used when none is configured
pub const DEFAULT_STEP_DAYS: u32 = 1;

/// Day of month assumed for month-only dates of birth
pub const DOB_ASSUMED_DAY: u32 = 15;

/// Days per year used for whole-year differences
pub const DAYS_PER_YEAR: i64 = 365;

// =============================================================================
// Locking
// =============================================================================

/// Directory holding lock files
pub const DEFAULT_LOCK_DIR: &str = "/var/lock";

/// Lock file name used when the caller provides none
pub const DEFAULT_LOCK_NAME: &str = "UNNAMED_LOCKFILE";

/// Interval between attempts to create a contended lock file
pub const LOCK_POLL_INTERVAL_MS: u64 = 100;

// =============================================================================
// Logging & Environment
// =============================================================================

/// Environment variable overriding the configured log directory
pub const LOG_DIR_ENV_VAR: &str = "INHS_LOGDIR";

/// Timestamp format for log lines
pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Log target name meaning "write to stderr"
pub const STDERR_LOG_TARGET: &str = "stderr";

/// One-minute load average at or above which the system counts as loaded
pub const LOAD_AVERAGE_THRESHOLD: f64 = 2.0;
