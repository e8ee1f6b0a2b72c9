//! Shared test utilities and fixtures for configuration tests

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub mod store_tests;

/// Write an INI file into `dir` and return its path
pub fn write_config(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Write a single `[SECTION]` file holding `key=value` pairs
pub fn write_section(dir: &Path, name: &str, section: &str, pairs: &[(&str, &str)]) -> PathBuf {
    let mut content = format!("[{}]\n", section);
    for (key, value) in pairs {
        content.push_str(&format!("{} = {}\n", key, value));
    }
    write_config(dir, name, &content)
}

/// Two candidate paths inside a fresh temp dir, neither created yet
pub fn candidate_paths() -> (TempDir, Vec<PathBuf>) {
    let temp_dir = TempDir::new().unwrap();
    let paths = vec![
        temp_dir.path().join("bogus.conf"),
        temp_dir.path().join("home-bogus.conf"),
    ];
    (temp_dir, paths)
}
