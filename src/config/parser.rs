//! INI file parsing.
//!
//! Accepts the classic ConfigParser dialect: `[section]` headers, `key=value`
//! or `key: value` pairs, `#`/`;`/`rem` comments, ` ;` inline comments and
//! indented continuation lines. Keys are lower-cased; section names keep
//! their case.

use crate::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::trace;

/// Section name to (key to raw value)
pub type SectionTable = BTreeMap<String, BTreeMap<String, String>>;

/// Parse INI text into a section table
///
/// `origin` is only used to label syntax errors.
pub fn parse_ini(content: &str, origin: &Path) -> Result<SectionTable> {
    let mut table = SectionTable::new();
    let mut current_section: Option<String> = None;
    let mut last_key: Option<String> = None;

    for (index, line) in content.lines().enumerate() {
        let line_number = index + 1;

        if is_comment(line) {
            continue;
        }

        if line.trim().is_empty() {
            // Blank lines end a value; a later indented line is not a continuation
            last_key = None;
            continue;
        }

        if line.starts_with(char::is_whitespace) {
            if let (Some(section), Some(key)) = (&current_section, &last_key) {
                if let Some(value) = table.get_mut(section).and_then(|s| s.get_mut(key)) {
                    let extra = line.trim();
                    if value.is_empty() {
                        value.push_str(extra);
                    } else {
                        value.push('\n');
                        value.push_str(extra);
                    }
                }
                continue;
            }
        }

        let trimmed = line.trim();

        if let Some(name) = parse_section_header(trimmed) {
            trace!("{}:{} section [{}]", origin.display(), line_number, name);
            table.entry(name.clone()).or_default();
            current_section = Some(name);
            last_key = None;
            continue;
        }

        let Some(section) = &current_section else {
            return Err(Error::config_syntax(
                origin,
                line_number,
                format!("file contains no section headers: '{}'", trimmed),
            ));
        };

        let Some((key, value)) = split_pair(trimmed) else {
            return Err(Error::config_syntax(
                origin,
                line_number,
                format!("expected 'key=value' or 'key: value', found '{}'", trimmed),
            ));
        };

        if key.is_empty() {
            return Err(Error::config_syntax(origin, line_number, "empty key"));
        }

        let key = key.to_lowercase();
        let value = strip_inline_comment(value);
        table
            .entry(section.clone())
            .or_default()
            .insert(key.clone(), value.to_string());
        last_key = Some(key);
    }

    Ok(table)
}

fn is_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    if trimmed.starts_with('#') || trimmed.starts_with(';') {
        return true;
    }
    // Only the unindented form counts for `rem`
    matches!(line.split(char::is_whitespace).next(), Some(word) if word.eq_ignore_ascii_case("rem"))
}

/// Cut a trailing `; comment` from a value
///
/// Only the first `;` is considered, and only when whitespace precedes it.
fn strip_inline_comment(value: &str) -> &str {
    match value.find(';') {
        Some(position) if value[..position].ends_with(char::is_whitespace) => {
            value[..position].trim_end()
        }
        _ => value,
    }
}

fn parse_section_header(trimmed: &str) -> Option<String> {
    let inner = trimmed.strip_prefix('[')?.strip_suffix(']')?;
    let name = inner.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Split on whichever of `=` or `:` comes first
fn split_pair(trimmed: &str) -> Option<(&str, &str)> {
    let position = trimmed.find(['=', ':'])?;
    let (key, rest) = trimmed.split_at(position);
    Some((key.trim(), rest[1..].trim()))
}
