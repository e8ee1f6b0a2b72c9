//! Typed configuration values and read-time coercion.
//!
//! Raw strings from the INI table are converted by their textual shape:
//! integers, decimals, boolean words and `~`-prefixed paths. Anything else
//! stays a string.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static INTEGER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+$").expect("valid integer pattern"));

static DECIMAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+\.\d+$").expect("valid decimal pattern"));

/// A configuration value after coercion
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl ConfigValue {
    /// Coerce a raw configuration string, first matching rule wins
    ///
    /// `"0"` and `"1"` are integers, never booleans. Integers too large for
    /// `i64` are left as text.
    pub fn coerce(raw: &str) -> Self {
        if INTEGER_PATTERN.is_match(raw) {
            if let Ok(value) = raw.parse::<i64>() {
                return Self::Integer(value);
            }
            return Self::Text(raw.to_string());
        }

        if DECIMAL_PATTERN.is_match(raw) {
            if let Ok(value) = raw.parse::<f64>() {
                return Self::Float(value);
            }
        }

        let word = raw.trim().to_lowercase();
        match word.as_str() {
            "t" | "true" => return Self::Boolean(true),
            "f" | "false" => return Self::Boolean(false),
            _ => {}
        }

        if raw.starts_with('~') {
            return Self::Text(expand_home(raw));
        }

        Self::Text(raw.to_string())
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Float view of the value; integers widen
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::Text(_) => "text",
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{:?}", value),
            Self::Boolean(value) => write!(f, "{}", value),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Expand a leading `~` or `~/` to the current user's home directory
///
/// `~user` forms and an unknown home directory leave the value unchanged.
pub fn expand_home(raw: &str) -> String {
    shellexpand::tilde(raw).into_owned()
}
