//! Named mutual exclusion across processes and threads.
//!
//! A [`Lock`] combines two layers that must both be held before the caller
//! proceeds:
//! - an in-process gate shared by every `Lock` naming the same path, so
//!   threads of one process queue up behind each other
//! - an advisory lock file created exclusively on disk, so separate
//!   processes honouring the same convention exclude each other
//!
//! [`Lock::acquire`] returns a [`LockGuard`]; the lock is released, file first
//! and gate second, when the guard is dropped or explicitly released.

use crate::constants::{DEFAULT_LOCK_DIR, DEFAULT_LOCK_NAME, LOCK_POLL_INTERVAL_MS};
use crate::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One gate per lock path for the whole process
///
/// Keys are lexically normalised (see [`gate_key`]). Entries live for the
/// process lifetime; the set of lock names a job uses is small and fixed.
static GATES: LazyLock<Mutex<HashMap<PathBuf, Arc<Gate>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

static TOKEN_SEQUENCE: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Default)]
struct GateState {
    held: bool,
    generation: u64,
}

/// In-process half of the lock
#[derive(Debug, Default)]
struct Gate {
    state: Mutex<GateState>,
    opened: Condvar,
}

/// Collapse repeated separators and `.` components so spellings of one
/// path share a gate. Symlinks and `..` are not resolved.
fn gate_key(path: &Path) -> PathBuf {
    path.components().collect()
}

impl Gate {
    fn for_path(path: &Path) -> Arc<Gate> {
        GATES
            .lock()
            .entry(gate_key(path))
            .or_default()
            .clone()
    }

    /// Wait for the gate; returns the holder's generation, or `None` on timeout
    fn enter(&self, deadline: Option<Instant>) -> Option<u64> {
        let mut state = self.state.lock();
        while state.held {
            match deadline {
                Some(deadline) => {
                    if self.opened.wait_until(&mut state, deadline).timed_out() && state.held {
                        return None;
                    }
                }
                None => self.opened.wait(&mut state),
            }
        }
        state.held = true;
        state.generation += 1;
        Some(state.generation)
    }

    /// Open the gate if `generation` still holds it
    fn leave(&self, generation: u64) -> bool {
        let mut state = self.state.lock();
        if state.held && state.generation == generation {
            state.held = false;
            self.opened.notify_one();
            true
        } else {
            false
        }
    }

    fn force_open(&self) {
        let mut state = self.state.lock();
        state.held = false;
        state.generation += 1;
        self.opened.notify_all();
    }
}

/// Cross-process and in-process lock on a named resource
#[derive(Debug, Clone)]
pub struct Lock {
    path: PathBuf,
    gate: Arc<Gate>,
}

impl Lock {
    /// Lock named `name` in the default lock directory
    pub fn new(name: &str) -> Self {
        Self::in_dir(DEFAULT_LOCK_DIR, name)
    }

    /// Lock named `name` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>, name: &str) -> Self {
        let name = if name.is_empty() { DEFAULT_LOCK_NAME } else { name };
        let path = dir.as_ref().join(name);
        let gate = Gate::for_path(&path);
        Self { path, gate }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until both layers are held or `timeout` elapses
    ///
    /// `None` waits indefinitely. A timeout yields [`Error::LockTimeout`],
    /// which callers may retry.
    pub fn acquire(&self, timeout: Option<Duration>) -> Result<LockGuard<'_>> {
        let started = Instant::now();
        let deadline = timeout.map(|t| started + t);
        debug!(
            "Attempt to acquire lock {} from PID {} at {}",
            self.path.display(),
            std::process::id(),
            now_str()
        );

        let generation = self
            .gate
            .enter(deadline)
            .ok_or_else(|| Error::lock_timeout(&self.path, started.elapsed()))?;

        let token = next_token();
        if let Err(err) = self.create_lock_file(&token, deadline, started) {
            self.gate.leave(generation);
            return Err(err);
        }

        debug!(
            "Successful acquisition of lock {} from PID {} at {}",
            self.path.display(),
            std::process::id(),
            now_str()
        );

        Ok(LockGuard {
            lock: self,
            token,
            generation,
            released: false,
        })
    }

    /// Forcibly clear the lock whoever holds it
    pub fn break_lock(&self) -> Result<()> {
        warn!(
            "Breaking lock {} from PID {}; any current holder no longer has exclusive access",
            self.path.display(),
            std::process::id()
        );

        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::io(
                    format!("Failed to remove lock file {}", self.path.display()),
                    e,
                ));
            }
        }
        self.gate.force_open();

        debug!(
            "Broke lock {} from PID {} at {}",
            self.path.display(),
            std::process::id(),
            now_str()
        );
        Ok(())
    }

    /// True while a lock file exists, whichever process created it
    pub fn is_locked(&self) -> bool {
        self.path.exists()
    }

    /// Ownership token of the current holder, if any
    pub fn owner(&self) -> Option<String> {
        std::fs::read_to_string(&self.path)
            .ok()
            .map(|token| token.trim().to_string())
    }

    fn create_lock_file(&self, token: &str, deadline: Option<Instant>, started: Instant) -> Result<()> {
        let poll = Duration::from_millis(LOCK_POLL_INTERVAL_MS);
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&self.path) {
                Ok(mut file) => {
                    if let Err(e) = file.write_all(token.as_bytes()) {
                        let _ = std::fs::remove_file(&self.path);
                        return Err(Error::io(
                            format!("Failed to write lock file {}", self.path.display()),
                            e,
                        ));
                    }
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    let wait = match deadline {
                        Some(deadline) => {
                            let now = Instant::now();
                            if now >= deadline {
                                return Err(Error::lock_timeout(&self.path, started.elapsed()));
                            }
                            poll.min(deadline - now)
                        }
                        None => poll,
                    };
                    std::thread::sleep(wait);
                }
                Err(e) => {
                    return Err(Error::io(
                        format!("Failed to create lock file {}", self.path.display()),
                        e,
                    ));
                }
            }
        }
    }

    /// Remove the lock file only if it still carries `token`
    fn remove_if_owned(&self, token: &str) -> Result<()> {
        match std::fs::read_to_string(&self.path) {
            Ok(found) if found.trim() == token => std::fs::remove_file(&self.path).map_err(|e| {
                Error::io(format!("Failed to remove lock file {}", self.path.display()), e)
            }),
            Ok(found) => {
                warn!(
                    "Lock file {} now owned by '{}', leaving it in place",
                    self.path.display(),
                    found.trim()
                );
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Lock file {} already removed", self.path.display());
                Ok(())
            }
            Err(e) => Err(Error::io(
                format!("Failed to read lock file {}", self.path.display()),
                e,
            )),
        }
    }
}

/// Proof of holding a [`Lock`]; releases it when dropped
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct LockGuard<'a> {
    lock: &'a Lock,
    token: String,
    generation: u64,
    released: bool,
}

impl LockGuard<'_> {
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Release now, reporting any failure to remove the lock file
    pub fn release(mut self) -> Result<()> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let file_result = self.lock.remove_if_owned(&self.token);
        self.lock.gate.leave(self.generation);

        debug!(
            "Released lock {} from PID {} at {}",
            self.lock.path.display(),
            std::process::id(),
            now_str()
        );
        file_result
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.release_inner() {
            warn!("Failed to release lock {}: {}", self.lock.path.display(), err);
        }
    }
}

fn next_token() -> String {
    let sequence = TOKEN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}:{}", std::process::id(), sequence)
}

fn now_str() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
