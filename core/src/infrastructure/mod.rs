//! Infrastructure seams between the engine and the outside world.
//!
//! The engine reads sessions and logs through provider traits, learns about
//! out-of-band changes through a `ChangeSubscription`, reports transitions
//! through a `NotificationSink`, and asks a `Clock` for the time. File-backed
//! and command-backed implementations live in `file`, `sink`, and `runner`;
//! `mock` holds controllable doubles for tests.

pub mod file;
pub mod mock;
pub mod runner;
pub mod sink;

use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;
use crate::types::log::LogEntry;
use crate::types::notification::NotificationEvent;
use crate::types::session::Session;

/// Source of the complete current set of monitored sessions.
pub trait SessionProvider: Send {
    fn fetch_recent(&self) -> Result<Vec<Session>>;
}

/// Source of a bounded recent log window across all sessions.
pub trait LogProvider: Send {
    /// At most `limit` of the most recent entries, in any order.
    fn fetch_recent(&self, limit: usize) -> Result<Vec<LogEntry>>;
}

/// Outward delivery of transition notifications. Best effort: the engine
/// logs a failure and moves on. `notify` runs on the monitoring thread, so
/// anything slow belongs in the background (see `sink::CommandSink`).
pub trait NotificationSink: Send {
    fn notify(&self, event: &NotificationEvent) -> Result<()>;
}

/// Push wake-up primitive. Every invocation of `on_change` means "something
/// changed, recompute now".
pub trait ChangeSubscription {
    fn subscribe(&self, on_change: Box<dyn Fn() + Send + Sync>) -> Result<()>;
}

/// Wall-clock time in milliseconds since the Unix epoch.
pub trait Clock: Send {
    fn now_ms(&self) -> u64;
}

/// `Clock` backed by `SystemTime`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}
