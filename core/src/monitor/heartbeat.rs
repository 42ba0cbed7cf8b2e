//! Heartbeat staleness detector — flags running sessions that stopped reporting.
//!
//! A running session's `last_updated_ms` is its heartbeat. Once the silence
//! exceeds the warning threshold the session is reported as a warning-tier
//! stuck job; past the critical threshold, as a critical-tier one. The tier is
//! part of the condition identity, so escalating from warning to critical
//! produces a new alert even if the warning was dismissed.

use crate::error::{MonitorError, Result};
use crate::types::health::{AlertCategory, Condition, Severity};
use crate::types::session::Session;


/// Liveness classification of a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatTier {
    Healthy,
    Warning,
    Critical,
}

/// Warning and critical silence thresholds, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessThresholds {
    warn_after_ms: u64,
    crit_after_ms: u64,
}

impl StalenessThresholds {
    /// Fails with `MonitorError::Settings` unless `warn_after_ms < crit_after_ms`.
    pub fn new(warn_after_ms: u64, crit_after_ms: u64) -> Result<Self> {
        if warn_after_ms >= crit_after_ms {
            return Err(MonitorError::Settings(format!(
                "warning threshold {}ms must be below critical threshold {}ms",
                warn_after_ms, crit_after_ms
            )));
        }
        Ok(Self {
            warn_after_ms,
            crit_after_ms,
        })
    }

    /// Silence beyond this is a warning.
    pub fn warn_after_ms(&self) -> u64 {
        self.warn_after_ms
    }

    /// Silence beyond this is critical.
    pub fn crit_after_ms(&self) -> u64 {
        self.crit_after_ms
    }

    /// Thresholds are exclusive: exactly `warn_after_ms` of silence is healthy.
    pub fn classify(&self, elapsed_ms: u64) -> HeartbeatTier {
        if elapsed_ms > self.crit_after_ms {
            HeartbeatTier::Critical
        } else if elapsed_ms > self.warn_after_ms {
            HeartbeatTier::Warning
        } else {
            HeartbeatTier::Healthy
        }
    }
}

impl Default for StalenessThresholds {
    /// Two minutes to warn, four to go critical.
    fn default() -> Self {
        Self {
            warn_after_ms: 120_000,
            crit_after_ms: 240_000,
        }
    }
}


/// Identity of a stuck-job condition at the given tier.
pub fn stuck_identity(session_id: &str, severity: Severity) -> String {
    match severity {
        Severity::Critical => format!("stuck-critical-{}", session_id),
        _ => format!("stuck-warning-{}", session_id),
    }
}


/// Produce one stuck-job condition per running session whose heartbeat is
/// older than the warning threshold.
///
/// Sessions that are not running, or that lack a last-update timestamp, are
/// skipped. A timestamp in the future counts as zero elapsed time.
pub fn detect_stale(
    sessions: &[&Session],
    thresholds: &StalenessThresholds,
    now_ms: u64,
) -> Vec<Condition> {
    let mut conditions = Vec::new();
    for session in sessions {
        if !session.is_running() {
            continue;
        }
        let last_updated_ms = match session.last_updated_ms {
            Some(ts) => ts,
            None => continue,
        };
        let elapsed_ms = now_ms.saturating_sub(last_updated_ms);
        let severity = match thresholds.classify(elapsed_ms) {
            HeartbeatTier::Healthy => continue,
            HeartbeatTier::Warning => Severity::Warning,
            HeartbeatTier::Critical => Severity::Critical,
        };
        conditions.push(Condition {
            category: AlertCategory::StuckJob,
            severity,
            session_id: Some(session.id.clone()),
            identity: stuck_identity(&session.id, severity),
            timestamp_ms: last_updated_ms,
            evidence: format!("no update for {}", format_elapsed(elapsed_ms)),
            count: 1,
        });
    }
    conditions
}


/// Render a duration as "4m 30s" / "45s".
pub fn format_elapsed(ms: u64) -> String {
    let secs = ms / 1000;
    let mins = secs / 60;
    if mins == 0 {
        format!("{}s", secs)
    } else if secs % 60 == 0 {
        format!("{}m", mins)
    } else {
        format!("{}m {}s", mins, secs % 60)
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
