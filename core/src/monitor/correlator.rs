//! Log pattern correlator — turns a bounded log window into conditions.
//!
//! Four independent rules run over the same window every tick:
//!
//! - **rate_limit**: the most recent line matching a rate-limit signature.
//! - **model_change**: the most recent line matching a model-fallback signature.
//! - **repeated_errors**: every session with at least N error lines inside the
//!   look-back window, one condition per session regardless of the count.
//! - **api_error / quota_warning**: the most recent error line matching a
//!   provider-failure signature, upgraded to a quota warning when it also
//!   matches a quota signature.
//!
//! `correlate` is pure: same window and `now_ms` give the same conditions.

use std::collections::BTreeMap;

use crate::monitor::signatures::{Signature, SignatureTable};
use crate::types::config::{MonitorSettings, SignatureClass};
use crate::types::health::{AlertCategory, Condition, Severity};
use crate::types::log::{LogEntry, LogLevel};


/// Maximum characters of a log message carried as evidence.
const EVIDENCE_CHARS: usize = 160;


/// Tunables for the repeated-errors rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelatorConfig {
    pub repeated_error_window_ms: u64,
    pub repeated_error_threshold: usize,
}

impl CorrelatorConfig {
    pub fn from_settings(settings: &MonitorSettings) -> Self {
        Self {
            repeated_error_window_ms: settings.repeated_error_window_ms,
            repeated_error_threshold: settings.repeated_error_threshold,
        }
    }
}

impl Default for CorrelatorConfig {
    /// Three errors within five minutes.
    fn default() -> Self {
        Self {
            repeated_error_window_ms: 300_000,
            repeated_error_threshold: 3,
        }
    }
}


/// Run every rule over `window` and collect the resulting conditions.
pub fn correlate(
    window: &[LogEntry],
    now_ms: u64,
    table: &SignatureTable,
    config: &CorrelatorConfig,
) -> Vec<Condition> {
    let texts: Vec<String> = window.iter().map(LogEntry::search_text).collect();
    let mut conditions = Vec::new();

    if let Some((index, sig)) = most_recent(window, &texts, |_, text| {
        table.match_class(SignatureClass::RateLimit, text)
    }) {
        conditions.push(line_condition(
            AlertCategory::RateLimit,
            sig.severity,
            "rate-limit",
            &window[index],
        ));
    }

    if let Some((index, sig)) = most_recent(window, &texts, |_, text| {
        table.match_class(SignatureClass::ModelChange, text)
    }) {
        conditions.push(line_condition(
            AlertCategory::ModelChange,
            sig.severity,
            "model-change",
            &window[index],
        ));
    }

    conditions.extend(repeated_errors(window, now_ms, config));

    if let Some((index, sig)) = most_recent(window, &texts, |entry, text| {
        if entry.level != LogLevel::Error {
            return None;
        }
        table
            .match_class(SignatureClass::ApiError, text)
            .or_else(|| table.match_class(SignatureClass::Quota, text))
    }) {
        let entry = &window[index];
        let condition = match table.match_class(SignatureClass::Quota, &texts[index]) {
            Some(quota) => line_condition(
                AlertCategory::QuotaWarning,
                quota.severity,
                "quota-warning",
                entry,
            ),
            None => line_condition(AlertCategory::ApiError, sig.severity, "api-error", entry),
        };
        conditions.push(condition);
    }

    conditions
}


/// One condition per session with at least `threshold` error lines no older
/// than the look-back window. Lines without a session id are ignored. Output
/// is ordered by session id.
pub fn repeated_errors(
    window: &[LogEntry],
    now_ms: u64,
    config: &CorrelatorConfig,
) -> Vec<Condition> {
    // session id -> (count, newest timestamp, newest message)
    let mut groups: BTreeMap<&str, (usize, u64, &str)> = BTreeMap::new();
    for entry in window {
        if entry.level != LogLevel::Error {
            continue;
        }
        let session_id = match entry.session_id.as_deref() {
            Some(id) => id,
            None => continue,
        };
        if now_ms.saturating_sub(entry.timestamp_ms) > config.repeated_error_window_ms {
            continue;
        }
        let group = groups
            .entry(session_id)
            .or_insert((0, entry.timestamp_ms, entry.message.as_str()));
        group.0 += 1;
        if entry.timestamp_ms >= group.1 {
            group.1 = entry.timestamp_ms;
            group.2 = entry.message.as_str();
        }
    }

    groups
        .into_iter()
        .filter(|(_, (count, _, _))| *count >= config.repeated_error_threshold)
        .map(|(session_id, (count, newest_ms, newest_message))| Condition {
            category: AlertCategory::RepeatedErrors,
            severity: Severity::Critical,
            session_id: Some(session_id.to_string()),
            identity: format!("repeated-errors-{}", session_id),
            timestamp_ms: newest_ms,
            evidence: format!(
                "{} errors in the last {}s, latest: {}",
                count,
                config.repeated_error_window_ms / 1000,
                truncate(newest_message)
            ),
            count: count as u32,
        })
        .collect()
}


/// Index of the newest entry (by timestamp, ties to the later position) for
/// which `pick` returns a signature, with that signature.
fn most_recent<'t, F>(
    window: &[LogEntry],
    texts: &[String],
    pick: F,
) -> Option<(usize, &'t Signature)>
where
    F: Fn(&LogEntry, &str) -> Option<&'t Signature>,
{
    let mut best: Option<(usize, &Signature)> = None;
    for (index, (entry, text)) in window.iter().zip(texts).enumerate() {
        let sig = match pick(entry, text) {
            Some(sig) => sig,
            None => continue,
        };
        let newer = match best {
            Some((current, _)) => entry.timestamp_ms >= window[current].timestamp_ms,
            None => true,
        };
        if newer {
            best = Some((index, sig));
        }
    }
    best
}


fn line_condition(
    category: AlertCategory,
    severity: Severity,
    prefix: &str,
    entry: &LogEntry,
) -> Condition {
    Condition {
        category,
        severity,
        session_id: entry.session_id.clone(),
        identity: format!("{}-{}", prefix, entry.id),
        timestamp_ms: entry.timestamp_ms,
        evidence: truncate(&entry.message),
        count: 1,
    }
}


fn truncate(message: &str) -> String {
    if message.chars().count() <= EVIDENCE_CHARS {
        return message.to_string();
    }
    let mut out: String = message.chars().take(EVIDENCE_CHARS).collect();
    out.push('…');
    out
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: u64 = 60_000;
    const NOW: u64 = 1_700_000_000_000;

    fn make_log(id: &str, session: Option<&str>, ago_ms: u64, level: LogLevel, msg: &str) -> LogEntry {
        LogEntry {
            id: id.into(),
            session_id: session.map(String::from),
            timestamp_ms: NOW - ago_ms,
            level,
            message: msg.into(),
            details: None,
        }
    }

    fn run(window: &[LogEntry]) -> Vec<Condition> {
        correlate(window, NOW, &SignatureTable::builtin(), &CorrelatorConfig::default())
    }

    fn of(conditions: &[Condition], category: AlertCategory) -> Vec<Condition> {
        conditions
            .iter()
            .filter(|c| c.category == category)
            .cloned()
            .collect()
    }

    #[test]
    fn empty_window_yields_nothing() {
        assert!(run(&[]).is_empty());
    }

    #[test]
    fn rate_limit_uses_most_recent_match() {
        let window = vec![
            make_log("l1", Some("s1"), 3 * MIN, LogLevel::Warning, "rate limit reached"),
            make_log("l2", Some("s2"), MIN, LogLevel::Info, "got 429, backing off"),
            make_log("l3", Some("s1"), 30_000, LogLevel::Info, "crawl step done"),
        ];
        let rate = of(&run(&window), AlertCategory::RateLimit);
        assert_eq!(rate.len(), 1);
        assert_eq!(rate[0].identity, "rate-limit-l2");
        assert_eq!(rate[0].session_id.as_deref(), Some("s2"));
        assert_eq!(rate[0].severity, Severity::Warning);
        assert_eq!(rate[0].timestamp_ms, NOW - MIN);
    }

    #[test]
    fn most_recent_is_by_timestamp_not_position() {
        let window = vec![
            make_log("newer", None, MIN, LogLevel::Info, "too many requests"),
            make_log("older", None, 2 * MIN, LogLevel::Info, "too many requests"),
        ];
        let rate = of(&run(&window), AlertCategory::RateLimit);
        assert_eq!(rate[0].identity, "rate-limit-newer");
    }

    #[test]
    fn rate_limit_matches_details_payload() {
        let mut entry = make_log("l1", Some("s1"), MIN, LogLevel::Error, "search call failed");
        entry.details = Some(serde_json::json!({"http_status": 429}));
        let rate = of(&run(&[entry]), AlertCategory::RateLimit);
        assert_eq!(rate.len(), 1);
    }

    #[test]
    fn model_change_is_info() {
        let window = vec![make_log(
            "l7",
            Some("s3"),
            MIN,
            LogLevel::Info,
            "Falling back to secondary model",
        )];
        let changes = of(&run(&window), AlertCategory::ModelChange);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].severity, Severity::Info);
        assert_eq!(changes[0].identity, "model-change-l7");
    }

    #[test]
    fn three_recent_errors_fire_once() {
        let window = vec![
            make_log("e1", Some("S2"), MIN, LogLevel::Error, "parse failed"),
            make_log("e2", Some("S2"), 2 * MIN, LogLevel::Error, "parse failed"),
            make_log("e3", Some("S2"), 3 * MIN, LogLevel::Error, "parse failed"),
        ];
        let bursts = of(&run(&window), AlertCategory::RepeatedErrors);
        assert_eq!(bursts.len(), 1);
        assert_eq!(bursts[0].identity, "repeated-errors-S2");
        assert_eq!(bursts[0].severity, Severity::Critical);
        assert_eq!(bursts[0].count, 3);
        assert_eq!(bursts[0].timestamp_ms, NOW - MIN);
    }

    #[test]
    fn forty_errors_still_fire_once() {
        let window: Vec<LogEntry> = (0..40)
            .map(|i| make_log(&format!("e{}", i), Some("s1"), i * 1000, LogLevel::Error, "boom"))
            .collect();
        let bursts = of(&run(&window), AlertCategory::RepeatedErrors);
        assert_eq!(bursts.len(), 1);
        assert_eq!(bursts[0].count, 40);
    }

    #[test]
    fn two_errors_do_not_fire() {
        let window = vec![
            make_log("e1", Some("s1"), MIN, LogLevel::Error, "boom"),
            make_log("e2", Some("s1"), 2 * MIN, LogLevel::Error, "boom"),
            make_log("w1", Some("s1"), 2 * MIN, LogLevel::Warning, "boom"),
        ];
        assert!(of(&run(&window), AlertCategory::RepeatedErrors).is_empty());
    }

    #[test]
    fn old_errors_fall_outside_window() {
        let window = vec![
            make_log("e1", Some("s1"), MIN, LogLevel::Error, "boom"),
            make_log("e2", Some("s1"), 2 * MIN, LogLevel::Error, "boom"),
            make_log("e3", Some("s1"), 6 * MIN, LogLevel::Error, "boom"),
        ];
        assert!(of(&run(&window), AlertCategory::RepeatedErrors).is_empty());
    }

    #[test]
    fn errors_exactly_at_window_edge_count() {
        let window = vec![
            make_log("e1", Some("s1"), 5 * MIN, LogLevel::Error, "boom"),
            make_log("e2", Some("s1"), 5 * MIN, LogLevel::Error, "boom"),
            make_log("e3", Some("s1"), 5 * MIN, LogLevel::Error, "boom"),
        ];
        assert_eq!(of(&run(&window), AlertCategory::RepeatedErrors).len(), 1);
    }

    #[test]
    fn errors_grouped_per_session() {
        let mut window = Vec::new();
        for i in 0..3 {
            window.push(make_log(&format!("a{}", i), Some("a"), MIN, LogLevel::Error, "x"));
            window.push(make_log(&format!("b{}", i), Some("b"), MIN, LogLevel::Error, "x"));
        }
        window.push(make_log("c0", Some("c"), MIN, LogLevel::Error, "x"));
        window.push(make_log("n0", None, MIN, LogLevel::Error, "x"));
        window.push(make_log("n1", None, MIN, LogLevel::Error, "x"));
        window.push(make_log("n2", None, MIN, LogLevel::Error, "x"));
        let bursts = of(&run(&window), AlertCategory::RepeatedErrors);
        let ids: Vec<&str> = bursts.iter().map(|c| c.identity.as_str()).collect();
        assert_eq!(ids, vec!["repeated-errors-a", "repeated-errors-b"]);
    }

    #[test]
    fn api_error_requires_error_level() {
        let window = vec![make_log("l1", Some("s1"), MIN, LogLevel::Warning, "API error: 503")];
        let conditions = run(&window);
        assert!(of(&conditions, AlertCategory::ApiError).is_empty());
        assert!(of(&conditions, AlertCategory::QuotaWarning).is_empty());
    }

    #[test]
    fn api_error_is_warning() {
        let window = vec![
            make_log("l1", Some("s1"), 2 * MIN, LogLevel::Error, "provider error: timeout"),
            make_log("l2", Some("s1"), MIN, LogLevel::Error, "502 Bad Gateway from scorer"),
        ];
        let conditions = run(&window);
        let api = of(&conditions, AlertCategory::ApiError);
        assert_eq!(api.len(), 1);
        assert_eq!(api[0].identity, "api-error-l2");
        assert_eq!(api[0].severity, Severity::Warning);
        assert!(of(&conditions, AlertCategory::QuotaWarning).is_empty());
    }

    #[test]
    fn quota_upgrades_api_error() {
        let window = vec![
            make_log("l1", Some("s1"), 2 * MIN, LogLevel::Error, "API error: 500"),
            make_log(
                "l2",
                Some("s1"),
                MIN,
                LogLevel::Error,
                "API error: insufficient_quota, check your billing",
            ),
        ];
        let conditions = run(&window);
        let quota = of(&conditions, AlertCategory::QuotaWarning);
        assert_eq!(quota.len(), 1);
        assert_eq!(quota[0].identity, "quota-warning-l2");
        assert_eq!(quota[0].severity, Severity::Critical);
        assert!(of(&conditions, AlertCategory::ApiError).is_empty());
    }

    #[test]
    fn only_most_recent_api_line_is_classified() {
        let window = vec![
            make_log("l1", Some("s1"), MIN, LogLevel::Error, "API error: 500"),
            make_log("l2", Some("s1"), 2 * MIN, LogLevel::Error, "API error: quota exceeded"),
        ];
        let conditions = run(&window);
        assert_eq!(of(&conditions, AlertCategory::ApiError).len(), 1);
        assert!(of(&conditions, AlertCategory::QuotaWarning).is_empty());
    }

    #[test]
    fn one_window_yields_several_categories() {
        let window = vec![
            make_log("l1", Some("s1"), MIN, LogLevel::Error, "429 Too Many Requests"),
            make_log("l2", Some("s1"), MIN, LogLevel::Error, "fallback model engaged"),
            make_log("l3", Some("s1"), MIN, LogLevel::Error, "API error: 503"),
        ];
        let conditions = run(&window);
        assert_eq!(of(&conditions, AlertCategory::RateLimit).len(), 1);
        assert_eq!(of(&conditions, AlertCategory::ModelChange).len(), 1);
        assert_eq!(of(&conditions, AlertCategory::RepeatedErrors).len(), 1);
        assert_eq!(of(&conditions, AlertCategory::ApiError).len(), 1);
    }

    #[test]
    fn correlate_is_deterministic() {
        let window = vec![
            make_log("l1", Some("s1"), MIN, LogLevel::Error, "rate limit"),
            make_log("l2", Some("s2"), MIN, LogLevel::Error, "API error"),
        ];
        assert_eq!(run(&window), run(&window));
    }

    #[test]
    fn long_messages_are_truncated() {
        let long = "x".repeat(500);
        let window = vec![make_log("l1", None, MIN, LogLevel::Info, &format!("rate limit {}", long))];
        let rate = of(&run(&window), AlertCategory::RateLimit);
        assert_eq!(rate[0].evidence.chars().count(), EVIDENCE_CHARS + 1);
        assert!(rate[0].evidence.ends_with('…'));
    }
}
