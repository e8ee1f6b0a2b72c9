//! Layered configuration management.
//!
//! A [`ConfigStore`] reads an ordered list of candidate INI files. Files that
//! do not exist are skipped; for the ones that do, a later file overrides an
//! earlier one key by key. Values are coerced to typed [`ConfigValue`]s when
//! read, never when loaded.
//!
//! ```no_run
//! use pheme_util::{ConfigStore, ConfigValue};
//!
//! # fn example() -> pheme_util::Result<()> {
//! let config = ConfigStore::from_default_sources()?;
//! let user = config.get("DB", "user")?;
//! let retries = config.get_or("DB", "retries", 3_i64);
//! if let ConfigValue::Integer(n) = retries {
//!     println!("{} may retry {} times", user, n);
//! }
//! # Ok(())
//! # }
//! ```

mod parser;
mod value;

#[cfg(test)]
mod tests;

pub use parser::{SectionTable, parse_ini};
pub use value::{ConfigValue, expand_home};

use crate::constants::{
    DEFAULT_SECTION, LOCAL_CONFIG_FILE, SYSTEM_CONFIG_FILE, USER_CONFIG_FILE_NAME,
};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Merged view of every existing configuration source
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    sources: Vec<PathBuf>,
    loaded: Vec<PathBuf>,
    table: SectionTable,
}

impl ConfigStore {
    /// Load `sources` in order, later files winning on conflicts
    ///
    /// Missing files are not an error. Malformed files fail immediately.
    pub fn load<I, P>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let sources: Vec<PathBuf> = sources
            .into_iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect();

        let mut store = Self {
            sources: sources.clone(),
            ..Default::default()
        };

        for path in &sources {
            if !path.exists() {
                debug!("Config source not present: {}", path.display());
                continue;
            }

            let content = std::fs::read_to_string(path).map_err(|e| {
                Error::io(format!("Failed to read config file {}", path.display()), e)
            })?;
            let parsed = parse_ini(&content, path)?;
            store.merge(parsed);
            store.loaded.push(path.clone());
            debug!("Loaded config source: {}", path.display());
        }

        Ok(store)
    }

    /// Load the standard project, system and per-user candidate files
    pub fn from_default_sources() -> Result<Self> {
        Self::load(default_sources())
    }

    fn merge(&mut self, parsed: SectionTable) {
        for (section, entries) in parsed {
            self.table.entry(section).or_default().extend(entries);
        }
    }

    /// Coerced value for `section`/`key`
    ///
    /// Fails with [`Error::MissingKey`] when the section is absent, or when
    /// neither it nor the `DEFAULT` section defines the key.
    pub fn get(&self, section: &str, key: &str) -> Result<ConfigValue> {
        match self.get_raw(section, key) {
            Some(raw) => Ok(ConfigValue::coerce(raw)),
            None => {
                let err = Error::missing_key(section, key, &self.sources);
                error!("{}", err);
                Err(err)
            }
        }
    }

    /// Coerced value for `section`/`key`, or `default` returned as given
    pub fn get_or(&self, section: &str, key: &str, default: impl Into<ConfigValue>) -> ConfigValue {
        match self.get_raw(section, key) {
            Some(raw) => ConfigValue::coerce(raw),
            None => default.into(),
        }
    }

    /// Uncoerced string for `section`/`key`
    ///
    /// `DEFAULT` is only consulted for sections that exist.
    pub fn get_raw(&self, section: &str, key: &str) -> Option<&str> {
        let key = key.to_lowercase();
        let entries = self.table.get(section)?;
        entries
            .get(&key)
            .or_else(|| {
                self.table
                    .get(DEFAULT_SECTION)
                    .and_then(|defaults| defaults.get(&key))
            })
            .map(String::as_str)
    }

    pub fn contains(&self, section: &str, key: &str) -> bool {
        self.get_raw(section, key).is_some()
    }

    /// Section names, excluding `DEFAULT`
    pub fn sections(&self) -> Vec<&str> {
        self.table
            .keys()
            .map(String::as_str)
            .filter(|name| *name != DEFAULT_SECTION)
            .collect()
    }

    /// Keys visible from `section`, including inherited `DEFAULT` keys
    pub fn keys(&self, section: &str) -> Vec<&str> {
        let Some(entries) = self.table.get(section) else {
            return Vec::new();
        };
        let mut keys: Vec<&str> = std::iter::once(entries)
            .chain(self.table.get(DEFAULT_SECTION))
            .flat_map(|entries| entries.keys().map(String::as_str))
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Every candidate path, in priority order
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// The candidate paths that existed and were read
    pub fn loaded_sources(&self) -> &[PathBuf] {
        &self.loaded
    }
}

/// Standard candidate files, lowest priority first
pub fn default_sources() -> Vec<PathBuf> {
    let mut sources = vec![
        PathBuf::from(LOCAL_CONFIG_FILE),
        PathBuf::from(SYSTEM_CONFIG_FILE),
    ];
    if let Some(home) = dirs::home_dir() {
        sources.push(home.join(USER_CONFIG_FILE_NAME));
    }
    sources
}
