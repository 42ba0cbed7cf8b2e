use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Feed position: critical sorts first.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 0,
            Severity::Warning => 1,
            Severity::Info => 2,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// What kind of anomaly a condition describes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    StuckJob,
    RateLimit,
    ModelChange,
    RepeatedErrors,
    ApiError,
    QuotaWarning,
}

impl fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertCategory::StuckJob => write!(f, "stuck_job"),
            AlertCategory::RateLimit => write!(f, "rate_limit"),
            AlertCategory::ModelChange => write!(f, "model_change"),
            AlertCategory::RepeatedErrors => write!(f, "repeated_errors"),
            AlertCategory::ApiError => write!(f, "api_error"),
            AlertCategory::QuotaWarning => write!(f, "quota_warning"),
        }
    }
}

/// A transiently detected anomaly. Recomputed from scratch every tick; only
/// `identity` links a condition to the same condition on another tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Condition {
    pub category: AlertCategory,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub identity: String,
    /// When the underlying evidence was recorded.
    pub timestamp_ms: u64,
    /// Short description of the evidence (matched line, elapsed time, ...).
    pub evidence: String,
    /// Number of supporting records.
    pub count: u32,
}

/// A condition promoted into the outward feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alert {
    pub identity: String,
    pub category: AlertCategory,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub title: String,
    pub message: String,
    pub timestamp_ms: u64,
}
