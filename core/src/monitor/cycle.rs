//! Monitoring cycle — one tick of the engine.
//!
//! `MonitorCycle` owns every piece of cross-tick state (snapshot, cached log
//! window, dismissals, remembered statuses) and composes the detectors into a
//! single recomputation:
//! 1. Stage the fresh session batch and log window, if any
//! 2. Detect stale heartbeats over the staged snapshot
//! 3. Correlate the log window
//! 4. Drop dismissed identities and rank what is left
//! 5. Plan transition notifications for the fresh batch
//! 6. Commit snapshot, window, and remembered statuses together
//!
//! Nothing is committed until every step has been computed, so an abandoned
//! tick leaves the cycle exactly as it was.

use tracing::debug;

use crate::error::Result;
use crate::monitor::correlator::{self, CorrelatorConfig};
use crate::monitor::dismissal::DismissalSet;
use crate::monitor::feed::{self, FeedSnapshot};
use crate::monitor::heartbeat::{self, StalenessThresholds};
use crate::monitor::signatures::SignatureTable;
use crate::monitor::snapshot::SnapshotStore;
use crate::monitor::transition::{TransitionNotifier, TransitionPlan};
use crate::types::config::MonitorSettings;
use crate::types::health::{Alert, Condition};
use crate::types::log::LogEntry;
use crate::types::notification::NotificationEvent;
use crate::types::session::Session;


/// What a tick learned from one source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceUpdate<T> {
    /// A new batch was fetched.
    Fresh(T),
    /// The fetch was attempted and failed.
    Failed,
    /// The source was not polled this tick.
    Unchanged,
}


/// Result of a committed tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub snapshot: FeedSnapshot,
    /// Transition notifications to deliver, already committed.
    pub events: Vec<NotificationEvent>,
}


#[derive(Debug, Clone)]
pub struct MonitorCycle {
    thresholds: StalenessThresholds,
    table: SignatureTable,
    correlator: CorrelatorConfig,
    store: SnapshotStore,
    dismissals: DismissalSet,
    notifier: TransitionNotifier,
    /// Last successfully fetched log window.
    log_window: Vec<LogEntry>,
    /// False when the last tick's log fetch failed. That tick, and re-ranks
    /// of it, run without log rules.
    logs_available: bool,
    tick: u64,
    last_now_ms: u64,
}

impl MonitorCycle {
    pub fn new(
        thresholds: StalenessThresholds,
        table: SignatureTable,
        correlator: CorrelatorConfig,
    ) -> Self {
        MonitorCycle {
            thresholds,
            table,
            correlator,
            store: SnapshotStore::new(),
            dismissals: DismissalSet::new(),
            notifier: TransitionNotifier::new(),
            log_window: Vec::new(),
            logs_available: true,
            tick: 0,
            last_now_ms: 0,
        }
    }

    pub fn from_settings(settings: &MonitorSettings) -> Result<Self> {
        let thresholds = StalenessThresholds::new(settings.warn_after_ms, settings.crit_after_ms)?;
        let table = SignatureTable::from_settings(settings)?;
        Ok(Self::new(
            thresholds,
            table,
            CorrelatorConfig::from_settings(settings),
        ))
    }

    /// Run one tick. Sessions that were not freshly fetched leave the
    /// snapshot and the notifier untouched; the clock still advances, so
    /// staleness keeps escalating.
    pub fn tick(
        &mut self,
        sessions: SourceUpdate<Vec<Session>>,
        logs: SourceUpdate<Vec<LogEntry>>,
        now_ms: u64,
    ) -> TickOutcome {
        let staged_store = match sessions {
            SourceUpdate::Fresh(batch) => {
                let mut store = SnapshotStore::new();
                store.ingest(batch);
                Some(store)
            }
            SourceUpdate::Failed => {
                debug!(tick = self.tick + 1, "session fetch failed, keeping previous snapshot");
                None
            }
            SourceUpdate::Unchanged => None,
        };
        let (staged_window, logs_available) = match logs {
            SourceUpdate::Fresh(window) => (Some(window), true),
            SourceUpdate::Failed => {
                debug!(tick = self.tick + 1, "log fetch failed, suppressing log conditions");
                (None, false)
            }
            SourceUpdate::Unchanged => (None, true),
        };

        let store = staged_store.as_ref().unwrap_or(&self.store);
        let window: &[LogEntry] = if logs_available {
            staged_window.as_deref().unwrap_or(&self.log_window)
        } else {
            &[]
        };
        let alerts = self.alerts_for(store, window, now_ms);
        let counts = store.counts();
        let plan = match &staged_store {
            Some(fresh) => self.notifier.plan(&fresh.list(), now_ms),
            None => TransitionPlan::default(),
        };

        if let Some(fresh) = staged_store {
            self.store = fresh;
            self.notifier.commit(&plan);
        }
        if let Some(window) = staged_window {
            self.log_window = window;
        }
        self.logs_available = logs_available;
        self.tick += 1;
        self.last_now_ms = now_ms;

        debug!(
            tick = self.tick,
            alerts = alerts.len(),
            events = plan.events.len(),
            "tick committed"
        );
        TickOutcome {
            snapshot: FeedSnapshot {
                alerts,
                counts,
                computed_ms: now_ms,
                tick: self.tick,
            },
            events: plan.events,
        }
    }

    /// Ranked alerts for the committed state at `now_ms`. Pure: calling it
    /// twice with the same `now_ms` gives the same answer.
    pub fn evaluate(&self, now_ms: u64) -> Vec<Alert> {
        let window: &[LogEntry] = if self.logs_available { &self.log_window } else { &[] };
        self.alerts_for(&self.store, window, now_ms)
    }

    /// Conditions before dismissal filtering, in detection order.
    pub fn conditions(&self, now_ms: u64) -> Vec<Condition> {
        let window: &[LogEntry] = if self.logs_available { &self.log_window } else { &[] };
        self.detect(&self.store, window, now_ms)
    }

    /// Re-rank the committed inputs at the last tick's time. Used after a
    /// dismissal changes what is visible without any new data.
    pub fn rerank(&self) -> FeedSnapshot {
        FeedSnapshot {
            alerts: self.evaluate(self.last_now_ms),
            counts: self.store.counts(),
            computed_ms: self.last_now_ms,
            tick: self.tick,
        }
    }

    pub fn dismiss(&mut self, identity: &str) -> bool {
        self.dismissals.dismiss(identity)
    }

    pub fn restore(&mut self, identity: &str) -> bool {
        self.dismissals.restore(identity)
    }

    pub fn any_running(&self) -> bool {
        self.store.any_running()
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn dismissals(&self) -> &DismissalSet {
        &self.dismissals
    }

    pub fn notifier(&self) -> &TransitionNotifier {
        &self.notifier
    }

    pub fn log_window(&self) -> &[LogEntry] {
        &self.log_window
    }

    /// Number of committed ticks.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    fn detect(&self, store: &SnapshotStore, window: &[LogEntry], now_ms: u64) -> Vec<Condition> {
        let mut conditions = heartbeat::detect_stale(&store.list(), &self.thresholds, now_ms);
        conditions.extend(correlator::correlate(window, now_ms, &self.table, &self.correlator));
        conditions
    }

    fn alerts_for(&self, store: &SnapshotStore, window: &[LogEntry], now_ms: u64) -> Vec<Alert> {
        let conditions = self.detect(store, window, now_ms);
        feed::rank(self.dismissals.filter(conditions))
    }
}

impl Default for MonitorCycle {
    fn default() -> Self {
        Self::new(
            StalenessThresholds::default(),
            SignatureTable::builtin(),
            CorrelatorConfig::default(),
        )
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
