//! File-backed providers and the file-change push subscription.
//!
//! `JsonSessionFile` reads a JSON array of session records. `JsonlLogFile`
//! reads a JSON Lines log. Both decode record by record: a malformed record
//! is skipped with a warning and never fails the whole fetch.
//! `FileChangeSubscription` polls modification times on a background thread
//! and calls back whenever a watched file changes.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::error::{MonitorError, Result};
use crate::types::log::LogEntry;
use crate::types::session::Session;

use super::{ChangeSubscription, LogProvider, SessionProvider};


// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Sessions stored as one JSON array. A missing file is an empty batch.
#[derive(Debug, Clone)]
pub struct JsonSessionFile {
    path: PathBuf,
}

impl JsonSessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonSessionFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionProvider for JsonSessionFile {
    fn fetch_recent(&self) -> Result<Vec<Session>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "session file absent");
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        let records: Vec<serde_json::Value> = serde_json::from_str(&data).map_err(|e| {
            MonitorError::Provider(format!(
                "{} is not a JSON array: {}",
                self.path.display(),
                e
            ))
        })?;
        let mut sessions = Vec::with_capacity(records.len());
        for (i, record) in records.into_iter().enumerate() {
            match serde_json::from_value::<Session>(record) {
                Ok(session) => sessions.push(session),
                Err(e) => warn!(
                    path = %self.path.display(),
                    index = i,
                    error = %e,
                    "skipping malformed session record"
                ),
            }
        }
        Ok(sessions)
    }
}


// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

/// Log entries stored one JSON object per line. A missing file is an empty
/// window.
#[derive(Debug, Clone)]
pub struct JsonlLogFile {
    path: PathBuf,
}

impl JsonlLogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonlLogFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogProvider for JsonlLogFile {
    /// The `limit` newest entries by timestamp, newest first.
    fn fetch_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "log file absent");
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(&self.path)?;
        let mut entries = Vec::new();
        for (i, line) in data.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEntry>(trimmed) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = i + 1,
                    error = %e,
                    "skipping malformed log line"
                ),
            }
        }
        // Stable sort keeps file order among equal timestamps, later lines
        // first after the reverse.
        entries.sort_by_key(|e| e.timestamp_ms);
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }
}


// ---------------------------------------------------------------------------
// Change subscription
// ---------------------------------------------------------------------------

/// Modification time and length, or `None` when the file is missing.
type Fingerprint = Option<(SystemTime, u64)>;

fn fingerprint(path: &Path) -> Fingerprint {
    let meta = fs::metadata(path).ok()?;
    let modified = meta.modified().ok()?;
    Some((modified, meta.len()))
}

/// Watches a set of files by polling their metadata. Each `subscribe` starts
/// one watcher thread; all of them stop when the subscription is dropped.
#[derive(Debug)]
pub struct FileChangeSubscription {
    paths: Vec<PathBuf>,
    interval: Duration,
    stop: Arc<AtomicBool>,
}

impl FileChangeSubscription {
    pub fn new(paths: Vec<PathBuf>, interval_ms: u64) -> Self {
        FileChangeSubscription {
            paths,
            interval: Duration::from_millis(interval_ms.max(1)),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Stop every watcher thread at its next poll.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl ChangeSubscription for FileChangeSubscription {
    fn subscribe(&self, on_change: Box<dyn Fn() + Send + Sync>) -> Result<()> {
        let paths = self.paths.clone();
        let interval = self.interval;
        let stop = Arc::clone(&self.stop);
        thread::Builder::new()
            .name("scoutwatch-file-watch".into())
            .spawn(move || {
                let mut last: Vec<Fingerprint> = paths.iter().map(|p| fingerprint(p)).collect();
                while !stop.load(Ordering::SeqCst) {
                    thread::sleep(interval);
                    let current: Vec<Fingerprint> =
                        paths.iter().map(|p| fingerprint(p)).collect();
                    if current != last {
                        debug!("watched file changed");
                        last = current;
                        on_change();
                    }
                }
            })?;
        Ok(())
    }
}

impl Drop for FileChangeSubscription {
    fn drop(&mut self) {
        self.stop();
    }
}


// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

#[cfg(test)]
pub fn test_dir(name: &str) -> PathBuf {
    use std::sync::atomic::AtomicU64;
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir = std::env::temp_dir()
        .join("scoutwatch_file_test")
        .join(format!("{}_{}_{}", name, std::process::id(), id));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
