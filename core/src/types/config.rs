use serde::{Deserialize, Serialize};

/// Log-line families the correlator recognises by signature.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SignatureClass {
    RateLimit,
    ModelChange,
    ApiError,
    Quota,
}

/// A user-supplied signature row: a case-insensitive regular expression
/// added to the built-in table for `class`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignatureSpec {
    pub class: SignatureClass,
    pub pattern: String,
}

/// Engine settings. Every field has a default so a partial YAML file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorSettings {
    /// Running sessions silent longer than this raise a warning.
    pub warn_after_ms: u64,
    /// Running sessions silent longer than this raise a critical alert.
    pub crit_after_ms: u64,
    /// Maximum number of recent log entries fetched per log poll.
    pub log_window: usize,
    /// Look-back for the repeated-errors rule.
    pub repeated_error_window_ms: u64,
    /// Error count per session at which the repeated-errors rule fires.
    pub repeated_error_threshold: usize,
    /// Session poll cadence while any session is running.
    pub active_poll_interval_ms: u64,
    /// Session poll cadence while nothing is running. 0 suspends idle polling.
    pub idle_poll_interval_ms: u64,
    /// Log window poll cadence.
    pub log_poll_interval_ms: u64,
    /// How often file-backed push subscriptions check for changes.
    pub watch_interval_ms: u64,
    pub signatures: Vec<SignatureSpec>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        MonitorSettings {
            warn_after_ms: 120_000,
            crit_after_ms: 240_000,
            log_window: 500,
            repeated_error_window_ms: 300_000,
            repeated_error_threshold: 3,
            active_poll_interval_ms: 10_000,
            idle_poll_interval_ms: 60_000,
            log_poll_interval_ms: 20_000,
            watch_interval_ms: 1_000,
            signatures: Vec::new(),
        }
    }
}
