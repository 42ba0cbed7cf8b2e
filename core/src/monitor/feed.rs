//! Alert ranking feed — converts surviving conditions into ordered alerts and
//! publishes the result to readers.
//!
//! Identities are unique per tick by construction of the detection rules, so
//! ranking does not deduplicate; it only templates and sorts.

use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::types::health::{Alert, AlertCategory, Condition, Severity};
use crate::types::session::SessionCounts;


/// Convert conditions into alerts, critical first. The sort is stable, so
/// alerts of equal severity keep detection order.
pub fn rank(conditions: Vec<Condition>) -> Vec<Alert> {
    let mut alerts: Vec<Alert> = conditions.into_iter().map(to_alert).collect();
    alerts.sort_by_key(|a| a.severity.rank());
    alerts
}


fn to_alert(condition: Condition) -> Alert {
    let title = title_for(condition.category, condition.severity).to_string();
    let detail = match condition.category {
        AlertCategory::StuckJob | AlertCategory::RepeatedErrors => condition.evidence.clone(),
        AlertCategory::RateLimit => {
            format!("requests are being throttled ({})", condition.evidence)
        }
        AlertCategory::ModelChange => format!("switched models ({})", condition.evidence),
        AlertCategory::ApiError => format!("provider call failed ({})", condition.evidence),
        AlertCategory::QuotaWarning => format!(
            "provider quota or billing limit reached ({})",
            condition.evidence
        ),
    };
    let message = match &condition.session_id {
        Some(id) => format!("Session {}: {}", id, detail),
        None => format!("System: {}", detail),
    };
    Alert {
        identity: condition.identity,
        category: condition.category,
        severity: condition.severity,
        session_id: condition.session_id,
        title,
        message,
        timestamp_ms: condition.timestamp_ms,
    }
}


pub fn title_for(category: AlertCategory, severity: Severity) -> &'static str {
    match category {
        AlertCategory::StuckJob if severity == Severity::Critical => "Session stuck",
        AlertCategory::StuckJob => "Session slow to report",
        AlertCategory::RateLimit => "Rate limit hit",
        AlertCategory::ModelChange => "Model fallback",
        AlertCategory::RepeatedErrors => "Repeated errors",
        AlertCategory::ApiError => "Provider API error",
        AlertCategory::QuotaWarning => "Provider quota exhausted",
    }
}


// ---------------------------------------------------------------------------
// Published feed
// ---------------------------------------------------------------------------

/// Everything readers see after a committed tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedSnapshot {
    /// Ranked, dismissal-filtered alerts.
    pub alerts: Vec<Alert>,
    pub counts: SessionCounts,
    /// `now` of the tick that produced this snapshot.
    pub computed_ms: u64,
    /// Sequence number of that tick; 0 before the first tick.
    pub tick: u64,
}


/// Cloneable read handle onto the latest feed. The daemon replaces the
/// snapshot wholesale; readers never see a half-written one.
#[derive(Debug, Clone, Default)]
pub struct AlertFeed {
    inner: Arc<RwLock<FeedSnapshot>>,
}

impl AlertFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current ranked alerts.
    pub fn current(&self) -> Vec<Alert> {
        self.snapshot().alerts
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Replace the current snapshot; readers see it on their next call.
    pub fn publish(&self, snapshot: FeedSnapshot) {
        match self.inner.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
