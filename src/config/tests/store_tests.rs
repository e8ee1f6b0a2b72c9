//! Tests for layered loading and lookup

use super::*;
use crate::config::{ConfigStore, ConfigValue};
use crate::Error;

#[test]
fn test_absent_sources_do_not_fail() {
    let (_temp_dir, paths) = candidate_paths();

    let store = ConfigStore::load(&paths).unwrap();

    assert!(store.loaded_sources().is_empty());
    assert_eq!(store.sources(), paths.as_slice());
    assert!(store.sections().is_empty());
}

#[test]
fn test_later_source_overrides() {
    let (temp_dir, paths) = candidate_paths();
    write_section(temp_dir.path(), "bogus.conf", "SECTION", &[("unittest", "0")]);
    write_section(temp_dir.path(), "home-bogus.conf", "SECTION", &[("unittest", "1")]);

    let store = ConfigStore::load(&paths).unwrap();

    assert_eq!(store.get("SECTION", "unittest").unwrap(), ConfigValue::Integer(1));
    assert_eq!(store.loaded_sources().len(), 2);
}

#[test]
fn test_override_is_per_key() {
    let (temp_dir, paths) = candidate_paths();
    write_config(temp_dir.path(), "bogus.conf", "[DB]\nuser = first\nhost = db1\n");
    write_config(temp_dir.path(), "home-bogus.conf", "[DB]\nuser = second\n");

    let store = ConfigStore::load(&paths).unwrap();

    assert_eq!(store.get("DB", "user").unwrap(), ConfigValue::Text("second".into()));
    assert_eq!(store.get("DB", "host").unwrap(), ConfigValue::Text("db1".into()));
}

#[test]
fn test_missing_key_without_default() {
    let (temp_dir, paths) = candidate_paths();
    write_section(temp_dir.path(), "bogus.conf", "section", &[("other", "x")]);

    let err = ConfigStore::load(&paths).unwrap().get("section", "value").unwrap_err();

    match &err {
        Error::MissingKey { section, key, sources } => {
            assert_eq!(section, "section");
            assert_eq!(key, "value");
            assert_eq!(sources, &paths);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("[section]value"));
}

#[test]
fn test_default_returned_verbatim() {
    let (_temp_dir, paths) = candidate_paths();
    let store = ConfigStore::load(&paths).unwrap();

    assert_eq!(store.get_or("Lifes", "Answer", 42_i64), ConfigValue::Integer(42));
    // Looks coercible, but defaults are never coerced
    assert_eq!(store.get_or("Lifes", "Answer", "42"), ConfigValue::Text("42".into()));
    assert_eq!(store.get_or("Lifes", "Answer", "true"), ConfigValue::Text("true".into()));
}

#[test]
fn test_present_value_ignores_default() {
    let (temp_dir, paths) = candidate_paths();
    write_section(temp_dir.path(), "bogus.conf", "s", &[("k", "7")]);

    let store = ConfigStore::load(&paths).unwrap();

    assert_eq!(store.get_or("s", "k", 1_i64), ConfigValue::Integer(7));
}

#[test]
fn test_key_lookup_is_case_insensitive() {
    let (temp_dir, paths) = candidate_paths();
    write_section(temp_dir.path(), "bogus.conf", "s", &[("LogDir", "/tmp")]);

    let store = ConfigStore::load(&paths).unwrap();

    assert!(store.contains("s", "logdir"));
    assert!(store.contains("s", "LOGDIR"));
    assert!(!store.contains("S", "logdir"));
}

#[test]
fn test_default_section_fallback() {
    let (temp_dir, paths) = candidate_paths();
    write_config(
        temp_dir.path(),
        "bogus.conf",
        "[DEFAULT]\ntimeout = 30\nhost = shared\n\n[DB]\nhost = local\n",
    );

    let store = ConfigStore::load(&paths).unwrap();

    assert_eq!(store.get("DB", "timeout").unwrap(), ConfigValue::Integer(30));
    assert_eq!(store.get("DB", "host").unwrap(), ConfigValue::Text("local".into()));
    assert_eq!(store.sections(), vec!["DB"]);
    assert_eq!(store.keys("DB"), vec!["host", "timeout"]);
}

#[test]
fn test_absent_section_ignores_default() {
    let (temp_dir, paths) = candidate_paths();
    write_config(temp_dir.path(), "bogus.conf", "[DEFAULT]\nhost = shared\n");

    let store = ConfigStore::load(&paths).unwrap();

    assert!(matches!(
        store.get("nosuchsection", "host"),
        Err(Error::MissingKey { .. })
    ));
    assert_eq!(store.get_or("nosuchsection", "host", "fallback"), ConfigValue::Text("fallback".into()));
    assert!(store.keys("nosuchsection").is_empty());
    assert_eq!(store.get("DEFAULT", "host").unwrap(), ConfigValue::Text("shared".into()));
}

#[test]
fn test_inline_comment_does_not_block_coercion() {
    let (temp_dir, paths) = candidate_paths();
    write_config(temp_dir.path(), "bogus.conf", "[DB]\nretries = 3 ; max attempts\n");

    let store = ConfigStore::load(&paths).unwrap();

    assert_eq!(store.get("DB", "retries").unwrap(), ConfigValue::Integer(3));
}

#[test]
fn test_raw_value_is_uncoerced() {
    let (temp_dir, paths) = candidate_paths();
    write_section(temp_dir.path(), "bogus.conf", "s", &[("flag", "TRUE")]);

    let store = ConfigStore::load(&paths).unwrap();

    assert_eq!(store.get_raw("s", "flag"), Some("TRUE"));
    assert_eq!(store.get("s", "flag").unwrap(), ConfigValue::Boolean(true));
}

#[test]
fn test_malformed_source_fails_load() {
    let (temp_dir, paths) = candidate_paths();
    write_config(temp_dir.path(), "home-bogus.conf", "no header = here\n");

    let err = ConfigStore::load(&paths).unwrap_err();

    assert!(matches!(err, Error::ConfigSyntax { line: 1, .. }));
}

#[test]
fn test_lookup_does_not_mutate() {
    let (temp_dir, paths) = candidate_paths();
    write_section(temp_dir.path(), "bogus.conf", "s", &[("n", "5")]);

    let store = ConfigStore::load(&paths).unwrap();
    let first = store.get("s", "n").unwrap();
    let second = store.get("s", "n").unwrap();

    assert_eq!(first, second);
    assert_eq!(store.get_raw("s", "n"), Some("5"));
}
