//! Controllable test doubles for the infrastructure traits.
//!
//! Every double is a cheap clone over shared state, so a test can hand one
//! copy to the engine (boxed) and keep another to steer it and inspect what
//! happened.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{MonitorError, Result};
use crate::types::log::LogEntry;
use crate::types::notification::NotificationEvent;
use crate::types::session::Session;

use super::{Clock, LogProvider, NotificationSink, SessionProvider};


fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match m.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}


// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct ProviderState<T> {
    batch: Vec<T>,
    /// Error returned by the next fetch instead of the batch.
    fail_next: Option<String>,
    /// Returned by every fetch until cleared.
    fail_always: Option<String>,
}

// Written out so `T` need not be `Default`.
impl<T> Default for ProviderState<T> {
    fn default() -> Self {
        ProviderState {
            batch: Vec::new(),
            fail_next: None,
            fail_always: None,
        }
    }
}

/// Serves whatever batch was last `set`, with injectable failures.
#[derive(Debug, Clone, Default)]
pub struct MockSessionProvider {
    state: Arc<Mutex<ProviderState<Session>>>,
    fetches: Arc<AtomicUsize>,
}

impl MockSessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(sessions: Vec<Session>) -> Self {
        let provider = Self::new();
        provider.set(sessions);
        provider
    }

    /// Replace the batch served by later fetches.
    pub fn set(&self, sessions: Vec<Session>) {
        lock(&self.state).batch = sessions;
    }

    pub fn fail_next(&self, message: &str) {
        lock(&self.state).fail_next = Some(message.to_string());
    }

    pub fn fail_always(&self, message: Option<&str>) {
        lock(&self.state).fail_always = message.map(String::from);
    }

    /// Number of fetches served so far, failed ones included.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl SessionProvider for MockSessionProvider {
    fn fetch_recent(&self) -> Result<Vec<Session>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut state = lock(&self.state);
        if let Some(msg) = state.fail_next.take().or_else(|| state.fail_always.clone()) {
            return Err(MonitorError::Provider(msg));
        }
        Ok(state.batch.clone())
    }
}


/// Serves the last `set` log window, truncated to the requested limit.
#[derive(Debug, Clone, Default)]
pub struct MockLogProvider {
    state: Arc<Mutex<ProviderState<LogEntry>>>,
    fetches: Arc<AtomicUsize>,
}

impl MockLogProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<LogEntry>) -> Self {
        let provider = Self::new();
        provider.set(entries);
        provider
    }

    pub fn set(&self, entries: Vec<LogEntry>) {
        lock(&self.state).batch = entries;
    }

    pub fn fail_next(&self, message: &str) {
        lock(&self.state).fail_next = Some(message.to_string());
    }

    pub fn fail_always(&self, message: Option<&str>) {
        lock(&self.state).fail_always = message.map(String::from);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl LogProvider for MockLogProvider {
    fn fetch_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut state = lock(&self.state);
        if let Some(msg) = state.fail_next.take().or_else(|| state.fail_always.clone()) {
            return Err(MonitorError::Provider(msg));
        }
        Ok(state.batch.iter().take(limit).cloned().collect())
    }
}


// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Records every event it is asked to deliver.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<NotificationEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        lock(&self.events).clone()
    }

    pub fn clear(&self) {
        lock(&self.events).clear();
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, event: &NotificationEvent) -> Result<()> {
        lock(&self.events).push(event.clone());
        Ok(())
    }
}


/// Rejects every event, counting the attempts.
#[derive(Debug, Clone, Default)]
pub struct FailingSink {
    attempts: Arc<AtomicUsize>,
}

impl FailingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl NotificationSink for FailingSink {
    fn notify(&self, _event: &NotificationEvent) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(MonitorError::Sink("notification permission denied".into()))
    }
}


// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// A clock that only moves when told to.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn at(now_ms: u64) -> Self {
        let clock = Self::default();
        clock.set(now_ms);
        clock
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
