//! Persisted date cursor for cron-driven jobs.
//!
//! A recurring job that walks through calendar days one invocation at a
//! time keeps its position in a small file holding a single `YYYY-MM-DD`
//! line. Each run reads the current date (or date range), processes it and
//! calls [`DateCursor::bump_date`] to move the cursor forward or backward by
//! the configured step.
//!
//! Ranges are inclusive. A forward cursor starting at 2010-01-01 with a step
//! of 10 covers 2010-01-01..=2010-01-10, then 2010-01-11..=2010-01-20.

use crate::constants::{DEFAULT_STEP_DAYS, PERSISTED_DATE_FORMAT};
use crate::{Error, Result};
use chrono::{Days, NaiveDate};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Which way the cursor moves on each bump
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "forward" | "forwards" => Ok(Self::Forward),
            "backward" | "backwards" => Ok(Self::Backward),
            other => Err(Error::configuration(format!(
                "Valid directions restricted to forwards, backwards; got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => f.write_str("forwards"),
            Self::Backward => f.write_str("backwards"),
        }
    }
}

/// Date that survives between process invocations
#[derive(Debug, Clone)]
pub struct DateCursor {
    current: NaiveDate,
    persistence_file: Option<PathBuf>,
    direction: Option<Direction>,
    step: u32,
}

impl DateCursor {
    /// Create a cursor starting at `initial_date`
    ///
    /// `persistence_file` is required whenever a `direction` is given.
    /// Without a direction nothing is read or written. A missing or zero
    /// `step` means one day.
    pub fn new(
        initial_date: NaiveDate,
        persistence_file: Option<PathBuf>,
        direction: Option<Direction>,
        step: Option<u32>,
    ) -> Result<Self> {
        if direction.is_some() && persistence_file.is_none() {
            return Err(Error::configuration(
                "`persistence_file` required to track date when a direction is set",
            ));
        }

        let step = step.filter(|s| *s > 0).unwrap_or(DEFAULT_STEP_DAYS);

        Ok(Self {
            current: initial_date,
            persistence_file,
            direction,
            step,
        })
    }

    /// A cursor that never persists and always reports `initial_date`
    pub fn fixed(initial_date: NaiveDate) -> Self {
        Self {
            current: initial_date,
            persistence_file: None,
            direction: None,
            step: DEFAULT_STEP_DAYS,
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn persistence_file(&self) -> Option<&Path> {
        self.persistence_file.as_deref()
    }

    /// Current date, refreshed from the persistence file when one applies
    ///
    /// The file is read on every call; its date replaces the in-memory one.
    pub fn get_date(&mut self) -> Result<NaiveDate> {
        if let Some(path) = self.tracked_file() {
            if path.exists() {
                let persisted = read_persisted_date(path)?;
                debug!("Read {} from datefile {}", persisted, path.display());
                self.current = persisted;
            }
        }
        Ok(self.current)
    }

    /// Inclusive `(start, end)` for this invocation
    ///
    /// Without a direction but with a step other than one, the window ends
    /// at the current date, as for a backward cursor.
    pub fn get_date_range(&mut self) -> Result<(NaiveDate, NaiveDate)> {
        let date = self.get_date()?;
        let span = i64::from(self.step) - 1;

        match (self.direction, self.step) {
            (Some(Direction::Forward), _) => Ok((date, shift(date, span)?)),
            (Some(Direction::Backward), _) => Ok((shift(date, -span)?, date)),
            (None, step) if step != 1 => Ok((shift(date, -span)?, date)),
            (None, _) => Ok((date, date)),
        }
    }

    /// Persist the next date per direction and step
    ///
    /// Returns the date written, or `None` when no direction is set.
    pub fn bump_date(&mut self) -> Result<Option<NaiveDate>> {
        let Some(direction) = self.direction else {
            return Ok(None);
        };

        let current = self.get_date()?;
        let days = match direction {
            Direction::Forward => i64::from(self.step),
            Direction::Backward => -i64::from(self.step),
        };
        let next = shift(current, days)?;

        if let Some(path) = self.tracked_file() {
            info!("writing to datefile {} : {}", path.display(), next);
            write_persisted_date(path, next)?;
        }

        Ok(Some(next))
    }

    fn tracked_file(&self) -> Option<&Path> {
        self.direction.and(self.persistence_file.as_deref())
    }
}

/// Move `date` by a signed number of days
fn shift(date: NaiveDate, days: i64) -> Result<NaiveDate> {
    let magnitude = Days::new(days.unsigned_abs());
    let shifted = if days >= 0 {
        date.checked_add_days(magnitude)
    } else {
        date.checked_sub_days(magnitude)
    };
    shifted.ok_or_else(|| Error::date_out_of_range(date, days))
}

fn read_persisted_date(path: &Path) -> Result<NaiveDate> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("Failed to read datefile {}", path.display()), e))?;
    let line = content.lines().next().unwrap_or("").trim_end();

    NaiveDate::parse_from_str(line, PERSISTED_DATE_FORMAT)
        .map_err(|e| Error::date_parsing(path, line, e))
}

fn write_persisted_date(path: &Path, date: NaiveDate) -> Result<()> {
    std::fs::write(path, date.format(PERSISTED_DATE_FORMAT).to_string())
        .map_err(|e| Error::io(format!("Failed to write datefile {}", path.display()), e))
}
