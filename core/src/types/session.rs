use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a scouting session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl SessionStatus {
    /// Completed, failed, and cancelled sessions are done.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Cancelled
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Pending => write!(f, "pending"),
            SessionStatus::Running => write!(f, "running"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Failed => write!(f, "failed"),
            SessionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionMetrics {
    #[serde(default)]
    pub sites_examined: u64,
    #[serde(default)]
    pub items_found: u64,
    #[serde(default)]
    pub items_discarded: u64,
    #[serde(default)]
    pub items_approved: u64,
}

/// One long-running background job as reported by the session provider.
///
/// `status` and `last_updated_ms` are optional so that a partial record can
/// still be decoded; the engine excludes such records from staleness and
/// transition evaluation instead of rejecting the whole batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub status: Option<SessionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default)]
    pub progress_percent: u8,
    #[serde(default)]
    pub metrics: SessionMetrics,
    #[serde(default)]
    pub last_updated_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Session {
    /// A bare session with the given status, last updated at `last_updated_ms`.
    pub fn new(id: &str, status: SessionStatus, last_updated_ms: u64) -> Self {
        Session {
            id: id.to_string(),
            status: Some(status),
            phase: None,
            progress_percent: 0,
            metrics: SessionMetrics::default(),
            last_updated_ms: Some(last_updated_ms),
            started_ms: None,
            completed_ms: None,
            error_message: None,
        }
    }

    /// True when the record lacks the fields the engine needs.
    pub fn is_malformed(&self) -> bool {
        self.status.is_none() || self.last_updated_ms.is_none()
    }

    pub fn is_running(&self) -> bool {
        self.status == Some(SessionStatus::Running)
    }
}

/// Per-status tally of the current snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionCounts {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Records missing a status or a last-update timestamp.
    pub malformed: usize,
}
