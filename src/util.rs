//! Small helpers shared by the job scripts.

use crate::config::{ConfigStore, ConfigValue};
use crate::constants::{
    DAYS_PER_YEAR, DOB_ASSUMED_DAY, GENERAL_SECTION, IN_PRODUCTION_KEY, LOAD_AVERAGE_THRESHOLD,
};
use crate::{Error, Result};
use chrono::NaiveDate;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, error, info};

/// Whether this installation is flagged as production
///
/// `[general] in_production` must be present and boolean; guessing is unsafe.
pub fn in_production(config: &ConfigStore) -> Result<bool> {
    if !config.contains(GENERAL_SECTION, IN_PRODUCTION_KEY) {
        return Err(Error::configuration(format!(
            "Config file doesn't specify `[{}]{}`, unsafe to guess, can't continue",
            GENERAL_SECTION, IN_PRODUCTION_KEY
        )));
    }
    match config.get(GENERAL_SECTION, IN_PRODUCTION_KEY)? {
        ConfigValue::Boolean(flag) => Ok(flag),
        other => Err(Error::configuration(format!(
            "`[{}]{}` must be true or false, found '{}'",
            GENERAL_SECTION, IN_PRODUCTION_KEY, other
        ))),
    }
}

/// True when the one-minute load average suggests the host is busy
///
/// Cron jobs call this before starting to avoid piling onto a loaded host.
pub fn system_under_load() -> bool {
    let load = sysinfo::System::load_average();
    if load.one < LOAD_AVERAGE_THRESHOLD {
        false
    } else {
        info!("System under load: {:.2}", load.one);
        true
    }
}

/// Whole years between two dates, counting 365 days per year
pub fn year_diff(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days().div_euclid(DAYS_PER_YEAR)
}

/// Date of birth known only to the month, as `YYYYMM` or `YYYY,MM`
///
/// The day is assumed to be the 15th. Blank input gives `None`.
pub fn dob_date(raw: &str) -> Result<Option<NaiveDate>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let (year, month) = match raw.split_once(',') {
        Some((year, month)) => (year.trim(), month.trim()),
        None if raw.len() >= 6 && raw.is_ascii() => (&raw[..4], &raw[raw.len() - 2..]),
        None => return Err(Error::invalid_date(raw, "expected YYYYMM or YYYY,MM")),
    };

    let year: i32 = year
        .parse()
        .map_err(|e| Error::invalid_date(raw, format!("bad year: {}", e)))?;
    let month: u32 = month
        .parse()
        .map_err(|e| Error::invalid_date(raw, format!("bad month: {}", e)))?;

    NaiveDate::from_ymd_opt(year, month, DOB_ASSUMED_DAY)
        .map(Some)
        .ok_or_else(|| Error::invalid_date(raw, "month out of range"))
}

/// Parse `YYYY-MM-DD` or `YYYYMMDD`
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let parts: Vec<&str> = if value.find('-').is_some_and(|i| i > 0) {
        value.split('-').collect()
    } else if value.len() == 8 && value.is_ascii() {
        vec![&value[..4], &value[4..6], &value[6..]]
    } else {
        return Err(Error::invalid_date(value, "expected YYYY-MM-DD or YYYYMMDD"));
    };

    let [year, month, day] = parts.as_slice() else {
        return Err(Error::invalid_date(
            value,
            format!("expected 3 date parts, found {}", parts.len()),
        ));
    };

    let year: i32 = year
        .parse()
        .map_err(|e| Error::invalid_date(value, format!("bad year: {}", e)))?;
    let month: u32 = month
        .parse()
        .map_err(|e| Error::invalid_date(value, format!("bad month: {}", e)))?;
    let day: u32 = day
        .parse()
        .map_err(|e| Error::invalid_date(value, format!("bad day: {}", e)))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| Error::invalid_date(value, "day is out of range for month"))
}

/// Join the present, non-empty fields with `:`
///
/// Gives a comparable key for an object built from a few of its fields.
pub fn string_fields<T: Display>(fields: &[Option<T>]) -> String {
    fields
        .iter()
        .flatten()
        .map(|f| f.to_string())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(":")
}

/// Smaller of two optional values; a lone `Some` wins
pub fn option_min<T: PartialOrd>(x: Option<T>, y: Option<T>) -> Option<T> {
    match (x, y) {
        (Some(x), Some(y)) => Some(if y < x { y } else { x }),
        (x, None) => x,
        (None, y) => y,
    }
}

/// Larger of two optional values; a lone `Some` wins
pub fn option_max<T: PartialOrd>(x: Option<T>, y: Option<T>) -> Option<T> {
    match (x, y) {
        (Some(x), Some(y)) => Some(if y > x { y } else { x }),
        (x, None) => x,
        (None, y) => y,
    }
}

/// Next free name of the form `path.N`
///
/// Returns `path` itself when nothing exists there yet. Otherwise N is one
/// past the largest numeric suffix already in use, starting at 1.
pub fn next_sequential_file(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Ok(path.to_path_buf());
    }

    let base = path.to_string_lossy();
    let pattern = format!("{}.*", glob::Pattern::escape(&base));
    let entries = glob::glob(&pattern)
        .map_err(|e| Error::configuration(format!("Invalid file pattern '{}': {}", pattern, e)))?;

    let highest = entries
        .flatten()
        .filter_map(|candidate| {
            let name = candidate.to_string_lossy().into_owned();
            name.strip_prefix(&format!("{}.", base))
                .and_then(|suffix| suffix.parse::<u64>().ok())
        })
        .max();

    let next = highest.map_or(1, |n| n + 1);
    Ok(PathBuf::from(format!("{}.{}", base, next)))
}

/// Run `cmd` through `sh -c`, failing on a non-zero exit or stderr output
///
/// With `ignore_stderr_alone` only the exit status decides success, for
/// tools that report progress on stderr. Returns stdout.
pub fn strict_execute(cmd: &str, ignore_stderr_alone: bool) -> Result<String> {
    debug!("Launch cmd: {}", cmd);
    let output = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .output()
        .map_err(|e| Error::io(format!("Failed to launch '{}'", cmd), e))?;

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let noisy = !ignore_stderr_alone && !stderr.trim().is_empty();

    if noisy || !output.status.success() {
        error!(
            "cmd '{}' generated unexpected retval '{}' or output '{}'",
            cmd,
            output.status,
            stderr.trim()
        );
        return Err(Error::command_failed(cmd, output.status.to_string(), stderr));
    }

    debug!("Successful execution of cmd: {}", cmd);
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2011-04-30").unwrap(), ymd(2011, 4, 30));
        assert_eq!(parse_date("20110430").unwrap(), ymd(2011, 4, 30));
        assert_eq!(parse_date("2011-4-3").unwrap(), ymd(2011, 4, 3));
    }

    #[test]
    fn test_parse_date_rejects_nonsense() {
        for bad in ["2011-02-30", "201104", "-2011-04-30", "2011-04", "abcdefgh", ""] {
            let err = parse_date(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidDate { .. }), "{bad:?}");
        }
    }

    #[test]
    fn test_dob_date() {
        assert_eq!(dob_date("197506").unwrap(), Some(ymd(1975, 6, 15)));
        assert_eq!(dob_date("1975,6").unwrap(), Some(ymd(1975, 6, 15)));
        assert_eq!(dob_date("  ").unwrap(), None);
        assert!(dob_date("197513").is_err());
        assert!(dob_date("1975").is_err());
    }

    #[test]
    fn test_year_diff() {
        assert_eq!(year_diff(ymd(2000, 1, 1), ymd(2010, 1, 5)), 10);
        assert_eq!(year_diff(ymd(2010, 1, 1), ymd(2010, 12, 31)), 0);
        assert_eq!(year_diff(ymd(2010, 1, 2), ymd(2010, 1, 1)), -1);
    }

    #[test]
    fn test_string_fields() {
        assert_eq!(string_fields(&[Some("a"), None, Some(""), Some("b")]), "a:b");
        assert_eq!(string_fields(&[Some(1), Some(22)]), "1:22");
        assert_eq!(string_fields::<&str>(&[None, None]), "");
    }

    #[test]
    fn test_option_min_max() {
        assert_eq!(option_min(Some(3), Some(1)), Some(1));
        assert_eq!(option_min(None, Some(1)), Some(1));
        assert_eq!(option_min(Some(3), None), Some(3));
        assert_eq!(option_min::<i32>(None, None), None);
        assert_eq!(option_max(Some(3), Some(1)), Some(3));
        assert_eq!(option_max(None, Some(1)), Some(1));
        assert_eq!(option_max::<i32>(None, None), None);
    }

    #[test]
    fn test_next_sequential_file() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("foo");

        assert_eq!(next_sequential_file(&base).unwrap(), base);

        fs::write(&base, "").unwrap();
        assert_eq!(
            next_sequential_file(&base).unwrap(),
            temp_dir.path().join("foo.1")
        );

        fs::write(temp_dir.path().join("foo.1"), "").unwrap();
        fs::write(temp_dir.path().join("foo.2"), "").unwrap();
        fs::write(temp_dir.path().join("foo.bak"), "").unwrap();
        assert_eq!(
            next_sequential_file(&base).unwrap(),
            temp_dir.path().join("foo.3")
        );
    }

    #[test]
    fn test_strict_execute_success() {
        assert_eq!(strict_execute("echo hello", false).unwrap(), "hello\n");
    }

    #[test]
    fn test_strict_execute_failure_status() {
        let err = strict_execute("exit 3", false).unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
    }

    #[test]
    fn test_strict_execute_stderr_noise() {
        assert!(strict_execute("echo oops >&2", false).is_err());
        assert_eq!(strict_execute("echo oops >&2; echo out", true).unwrap(), "out\n");
    }

    #[test]
    fn test_in_production() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("pheme.conf");

        fs::write(&path, "[general]\nin_production = False\n").unwrap();
        assert!(!in_production(&ConfigStore::load([&path]).unwrap()).unwrap());

        fs::write(&path, "[general]\nin_production = t\n").unwrap();
        assert!(in_production(&ConfigStore::load([&path]).unwrap()).unwrap());

        fs::write(&path, "[general]\nin_production = maybe\n").unwrap();
        assert!(in_production(&ConfigStore::load([&path]).unwrap()).is_err());

        fs::write(&path, "[general]\n").unwrap();
        assert!(in_production(&ConfigStore::load([&path]).unwrap()).is_err());
    }
}
