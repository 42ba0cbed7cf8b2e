//! Daemon — the scoutwatch main event loop.
//!
//! The daemon is single-threaded for state mutation. It owns the
//! `MonitorCycle`, and every trigger reaches it through one mpsc channel:
//! push wake-ups from change subscriptions, operator dismissals, and
//! shutdown. Poll timers are deadlines the loop waits on with
//! `recv_timeout`, so ticks can never overlap.
//!
//! # Main loop tick
//!
//! 1. Drain channel: apply dismissals, note wake-ups, stop on shutdown
//! 2. Decide which sources are due (wake-up forces both)
//! 3. Fetch, run one cycle tick, publish the feed, deliver notifications
//! 4. If nothing was due but a dismissal changed, re-rank and publish

use std::sync::mpsc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{MonitorError, Result};
use crate::infrastructure::sink::LogSink;
use crate::infrastructure::{
    ChangeSubscription, Clock, LogProvider, NotificationSink, SessionProvider, SystemClock,
};
use crate::monitor::cycle::{MonitorCycle, SourceUpdate};
use crate::monitor::feed::{AlertFeed, FeedSnapshot};
use crate::types::config::MonitorSettings;


/// Events that can be sent to the daemon's main loop via the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// Something changed upstream; refetch both sources now.
    Wake { source: String },
    /// Operator acknowledged an alert identity.
    Dismiss(String),
    /// Operator withdrew an acknowledgement.
    Restore(String),
    /// Request the daemon to shut down gracefully.
    Shutdown,
}


/// Poll cadences for the daemon loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Session poll interval while any session is running.
    pub active_poll_interval_ms: u64,
    /// Session poll interval while nothing is running; 0 suspends it.
    pub idle_poll_interval_ms: u64,
    pub log_poll_interval_ms: u64,
    /// Entries requested from the log provider per poll.
    pub log_window: usize,
}

impl DaemonConfig {
    pub fn from_settings(settings: &MonitorSettings) -> Self {
        DaemonConfig {
            active_poll_interval_ms: settings.active_poll_interval_ms,
            idle_poll_interval_ms: settings.idle_poll_interval_ms,
            log_poll_interval_ms: settings.log_poll_interval_ms,
            log_window: settings.log_window,
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self::from_settings(&MonitorSettings::default())
    }
}


/// Handle returned from `MonitorDaemon::handle()` allowing threads to send events.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    sender: mpsc::Sender<MonitorEvent>,
}

impl MonitorHandle {
    /// Force an immediate tick. Wake-ups queued before the daemon gets to
    /// them collapse into one tick.
    pub fn wake(&self, source: &str) -> Result<()> {
        self.send(MonitorEvent::Wake {
            source: source.to_string(),
        })
    }

    pub fn dismiss(&self, identity: &str) -> Result<()> {
        self.send(MonitorEvent::Dismiss(identity.to_string()))
    }

    pub fn restore(&self, identity: &str) -> Result<()> {
        self.send(MonitorEvent::Restore(identity.to_string()))
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(MonitorEvent::Shutdown)
    }

    fn send(&self, event: MonitorEvent) -> Result<()> {
        self.sender
            .send(event)
            .map_err(|_| MonitorError::ChannelClosed)
    }
}


type Observer = Box<dyn FnMut(&FeedSnapshot) + Send>;

/// The scoutwatch daemon. Owns the cycle, the providers, and the feed.
pub struct MonitorDaemon {
    cycle: MonitorCycle,
    config: DaemonConfig,
    sessions: Box<dyn SessionProvider>,
    logs: Box<dyn LogProvider>,
    sink: Box<dyn NotificationSink>,
    clock: Box<dyn Clock>,
    feed: AlertFeed,
    observer: Option<Observer>,
    receiver: mpsc::Receiver<MonitorEvent>,
    handle: MonitorHandle,
    /// Events taken off the channel while waiting, not yet processed.
    pending: Vec<MonitorEvent>,
    /// `None` while session polling is suspended.
    next_session_poll_ms: Option<u64>,
    next_log_poll_ms: u64,
}

impl MonitorDaemon {
    /// Build a daemon that logs notifications and reads the system clock.
    pub fn new(
        cycle: MonitorCycle,
        config: DaemonConfig,
        sessions: Box<dyn SessionProvider>,
        logs: Box<dyn LogProvider>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel();
        MonitorDaemon {
            cycle,
            config,
            sessions,
            logs,
            sink: Box::new(LogSink),
            clock: Box::new(SystemClock),
            feed: AlertFeed::new(),
            observer: None,
            receiver,
            handle: MonitorHandle { sender },
            pending: Vec::new(),
            next_session_poll_ms: Some(0),
            next_log_poll_ms: 0,
        }
    }

    pub fn from_settings(
        settings: &MonitorSettings,
        sessions: Box<dyn SessionProvider>,
        logs: Box<dyn LogProvider>,
    ) -> Result<Self> {
        let cycle = MonitorCycle::from_settings(settings)?;
        Ok(Self::new(
            cycle,
            DaemonConfig::from_settings(settings),
            sessions,
            logs,
        ))
    }

    pub fn with_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Call `observer` with every snapshot the daemon publishes.
    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Get a handle for sending events to this daemon.
    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    /// Read handle onto the published feed.
    pub fn feed(&self) -> AlertFeed {
        self.feed.clone()
    }

    /// Borrow the cycle for inspection (testing).
    pub fn cycle(&self) -> &MonitorCycle {
        &self.cycle
    }

    /// Route every change notification from `subscription` into a wake-up.
    pub fn subscribe(&self, subscription: &dyn ChangeSubscription, source: &str) -> Result<()> {
        let handle = self.handle();
        let source = source.to_string();
        subscription.subscribe(Box::new(move || {
            if handle.wake(&source).is_err() {
                debug!(source = %source, "wake-up after daemon shutdown");
            }
        }))
    }

    /// Run the main event loop. Blocks until shutdown is received.
    pub fn run(&mut self) -> Result<()> {
        info!("monitor daemon started");
        loop {
            self.wait_for_event();
            if self.tick() {
                break;
            }
        }
        info!(ticks = self.cycle.tick_count(), "monitor daemon stopped");
        Ok(())
    }

    /// Run exactly one pass of the main loop without blocking.
    /// Returns true if shutdown was requested.
    pub fn tick(&mut self) -> bool {
        let mut events = std::mem::take(&mut self.pending);
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }

        let mut wake = false;
        let mut dismissals_changed = false;
        for event in events {
            match event {
                MonitorEvent::Wake { source } => {
                    debug!(source = %source, "wake-up");
                    wake = true;
                }
                MonitorEvent::Dismiss(identity) => {
                    if self.cycle.dismiss(&identity) {
                        info!(identity = %identity, "alert dismissed");
                        dismissals_changed = true;
                    }
                }
                MonitorEvent::Restore(identity) => {
                    if self.cycle.restore(&identity) {
                        info!(identity = %identity, "alert restored");
                        dismissals_changed = true;
                    }
                }
                MonitorEvent::Shutdown => return true,
            }
        }

        let now = self.clock.now_ms();
        let poll_sessions = wake || self.next_session_poll_ms.map_or(false, |at| now >= at);
        let poll_logs = wake || now >= self.next_log_poll_ms;
        if poll_sessions || poll_logs {
            self.run_cycle(poll_sessions, poll_logs, now);
        } else if dismissals_changed {
            let snapshot = self.cycle.rerank();
            self.publish(snapshot);
        }
        false
    }

    /// Earliest poll deadline.
    pub fn next_deadline_ms(&self) -> u64 {
        self.next_session_poll_ms
            .unwrap_or(u64::MAX)
            .min(self.next_log_poll_ms)
    }

    pub fn next_session_poll_ms(&self) -> Option<u64> {
        self.next_session_poll_ms
    }

    pub fn next_log_poll_ms(&self) -> u64 {
        self.next_log_poll_ms
    }

    /// Block until an event arrives or the next poll is due.
    fn wait_for_event(&mut self) {
        if !self.pending.is_empty() {
            return;
        }
        let now = self.clock.now_ms();
        let timeout = Duration::from_millis(self.next_deadline_ms().saturating_sub(now));
        if let Ok(event) = self.receiver.recv_timeout(timeout) {
            self.pending.push(event);
        }
    }

    fn run_cycle(&mut self, poll_sessions: bool, poll_logs: bool, now: u64) {
        let sessions = if poll_sessions {
            match self.sessions.fetch_recent() {
                Ok(batch) => SourceUpdate::Fresh(batch),
                Err(e) => {
                    warn!(error = %e, "session fetch failed");
                    SourceUpdate::Failed
                }
            }
        } else {
            SourceUpdate::Unchanged
        };
        let logs = if poll_logs {
            match self.logs.fetch_recent(self.config.log_window) {
                Ok(window) => SourceUpdate::Fresh(window),
                Err(e) => {
                    warn!(error = %e, "log fetch failed");
                    SourceUpdate::Failed
                }
            }
        } else {
            SourceUpdate::Unchanged
        };

        let outcome = self.cycle.tick(sessions, logs, now);

        if poll_sessions {
            let interval = if self.cycle.any_running() {
                self.config.active_poll_interval_ms
            } else {
                self.config.idle_poll_interval_ms
            };
            self.next_session_poll_ms = match interval {
                0 => None,
                ms => Some(now.saturating_add(ms)),
            };
        }
        if poll_logs {
            self.next_log_poll_ms = now.saturating_add(self.config.log_poll_interval_ms);
        }

        self.publish(outcome.snapshot);
        for event in &outcome.events {
            info!(session = %event.session_id, kind = %event.kind, "session finished");
            if let Err(e) = self.sink.notify(event) {
                warn!(session = %event.session_id, error = %e, "notification not delivered");
            }
        }
    }

    fn publish(&mut self, snapshot: FeedSnapshot) {
        debug!(tick = snapshot.tick, alerts = snapshot.alerts.len(), "feed published");
        if let Some(observer) = self.observer.as_mut() {
            observer(&snapshot);
        }
        self.feed.publish(snapshot);
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
