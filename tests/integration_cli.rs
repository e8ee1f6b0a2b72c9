//! End-to-end tests driving the `pheme-util` binary
//!
//! These run the compiled binary the way a cron script would and check its
//! stdout, exit status and side effects on disk.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn pheme_util(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pheme-util"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run pheme-util")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

#[test]
fn test_config_get_layers_and_coerces() {
    let temp_dir = TempDir::new().unwrap();
    let low = temp_dir.path().join("low.conf");
    let high = temp_dir.path().join("high.conf");
    fs::write(&low, "[DB]\nport = 5432\nuser = first\n").unwrap();
    fs::write(&high, "[DB]\nuser = second\n").unwrap();

    let args = ["-c", path_str(&low), "-c", path_str(&high), "config", "get", "DB"];

    let user = pheme_util(&[&args[..], &["user"]].concat());
    assert!(user.status.success());
    assert_eq!(stdout(&user), "second\n");

    let port = pheme_util(&[&args[..], &["port"]].concat());
    assert_eq!(stdout(&port), "5432\n");
}

#[test]
fn test_config_get_missing_key_fails() {
    let temp_dir = TempDir::new().unwrap();
    let conf = temp_dir.path().join("only.conf");
    fs::write(&conf, "[DB]\nuser = x\n").unwrap();

    let output = pheme_util(&["-c", path_str(&conf), "config", "get", "DB", "password"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("[DB]password"));
}

#[test]
fn test_config_get_default_verbatim() {
    let temp_dir = TempDir::new().unwrap();
    let conf = temp_dir.path().join("absent.conf");

    let output = pheme_util(&[
        "-c", path_str(&conf), "config", "get", "Lifes", "Answer", "--default", "TRUE",
    ]);

    assert!(output.status.success());
    assert_eq!(stdout(&output), "TRUE\n");
}

#[test]
fn test_date_bump_persists_between_runs() {
    let temp_dir = TempDir::new().unwrap();
    let conf = temp_dir.path().join("none.conf");
    let file = temp_dir.path().join("cursor.date");
    let cursor = [
        "-c", path_str(&conf), "date", "--initial", "2009-01-01", "--file", path_str(&file),
        "--direction", "backwards", "--step", "10",
    ];

    let show = |action: &str| {
        let mut argv: Vec<&str> = cursor.to_vec();
        argv.insert(3, action);
        pheme_util(&argv)
    };

    assert_eq!(stdout(&show("show")), "2009-01-01\n");
    assert_eq!(stdout(&show("bump")), "2008-12-22\n");
    assert_eq!(stdout(&show("range")), "2008-12-13 2008-12-22\n");
    assert_eq!(fs::read_to_string(&file).unwrap(), "2008-12-22");
}

#[test]
fn test_date_direction_without_file_fails() {
    let temp_dir = TempDir::new().unwrap();
    let conf = temp_dir.path().join("none.conf");

    let output = pheme_util(&[
        "-c", path_str(&conf), "date", "show", "--initial", "2009-01-01", "--direction", "forwards",
    ]);

    assert!(!output.status.success());
}

#[test]
fn test_lock_run_status_and_break() {
    let temp_dir = TempDir::new().unwrap();
    let conf = temp_dir.path().join("none.conf");
    let lock_dir = path_str(temp_dir.path());
    let base = ["-c", path_str(&conf), "lock"];

    let run = pheme_util(
        &[&base[..], &["run", "--name", "job", "--lock-dir", lock_dir, "--timeout", "5", "--", "echo", "done"]].concat(),
    );
    assert!(run.status.success());
    assert_eq!(stdout(&run), "done\n");
    assert!(!temp_dir.path().join("job").exists());

    // Simulate a lock left behind by a crashed process
    fs::write(temp_dir.path().join("job"), "4242:0").unwrap();

    let status = pheme_util(&[&base[..], &["status", "--name", "job", "--lock-dir", lock_dir]].concat());
    assert!(stdout(&status).starts_with("locked"));
    assert!(stdout(&status).contains("4242:0"));

    let blocked = pheme_util(
        &[&base[..], &["run", "--name", "job", "--lock-dir", lock_dir, "--timeout", "0.2", "--", "true"]].concat(),
    );
    assert!(!blocked.status.success());

    let broke = pheme_util(&[&base[..], &["break", "--name", "job", "--lock-dir", lock_dir]].concat());
    assert!(broke.status.success());
    assert!(!temp_dir.path().join("job").exists());
}

#[test]
fn test_lock_run_passes_one_shell_string() {
    let temp_dir = TempDir::new().unwrap();
    let conf = temp_dir.path().join("none.conf");
    let lock_dir = path_str(temp_dir.path());

    let run = pheme_util(&[
        "-c", path_str(&conf), "lock", "run", "--name", "quoted", "--lock-dir", lock_dir, "--",
        "printf '%s\\n' 'a b'",
    ]);

    assert!(run.status.success());
    assert_eq!(stdout(&run), "a b\n");
}
