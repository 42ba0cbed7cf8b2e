//! Alert dismissal — operator acknowledgements keyed by condition identity.
//!
//! Dismissals live for the life of the process. A dismissed identity stays
//! suppressed on every later tick that reproduces it; a condition whose
//! identity changes (e.g. a stuck job escalating from warning to critical) is
//! a different alert and is not suppressed.

use std::collections::HashSet;

use crate::types::health::Condition;


#[derive(Debug, Clone, Default)]
pub struct DismissalSet {
    dismissed: HashSet<String>,
}

impl DismissalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acknowledge `identity`. Returns true if it was not already dismissed.
    pub fn dismiss(&mut self, identity: &str) -> bool {
        self.dismissed.insert(identity.to_string())
    }

    /// Undo a dismissal. Returns true if the identity had been dismissed.
    pub fn restore(&mut self, identity: &str) -> bool {
        self.dismissed.remove(identity)
    }

    pub fn is_dismissed(&self, identity: &str) -> bool {
        self.dismissed.contains(identity)
    }

    /// Keep only conditions whose identity has not been dismissed.
    pub fn filter(&self, conditions: Vec<Condition>) -> Vec<Condition> {
        conditions
            .into_iter()
            .filter(|c| !self.is_dismissed(&c.identity))
            .collect()
    }

    /// Dismissed identities, sorted.
    pub fn identities(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.dismissed.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.dismissed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dismissed.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::health::{AlertCategory, Severity};

    fn condition(identity: &str) -> Condition {
        Condition {
            category: AlertCategory::StuckJob,
            severity: Severity::Critical,
            session_id: Some("s1".into()),
            identity: identity.into(),
            timestamp_ms: 0,
            evidence: String::new(),
            count: 1,
        }
    }

    #[test]
    fn dismiss_filters_matching_identity() {
        let mut set = DismissalSet::new();
        assert!(set.dismiss("stuck-critical-s1"));
        let kept = set.filter(vec![condition("stuck-critical-s1"), condition("stuck-critical-s2")]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].identity, "stuck-critical-s2");
    }

    #[test]
    fn dismissal_persists_across_filters() {
        let mut set = DismissalSet::new();
        set.dismiss("repeated-errors-s1");
        for _ in 0..3 {
            assert!(set.filter(vec![condition("repeated-errors-s1")]).is_empty());
        }
    }

    #[test]
    fn different_identity_is_not_suppressed() {
        let mut set = DismissalSet::new();
        set.dismiss("stuck-warning-s1");
        let kept = set.filter(vec![condition("stuck-critical-s1")]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn double_dismiss_reports_existing() {
        let mut set = DismissalSet::new();
        assert!(set.dismiss("a"));
        assert!(!set.dismiss("a"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn restore_brings_alert_back() {
        let mut set = DismissalSet::new();
        set.dismiss("a");
        assert!(set.restore("a"));
        assert!(!set.restore("a"));
        assert_eq!(set.filter(vec![condition("a")]).len(), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn identities_sorted() {
        let mut set = DismissalSet::new();
        set.dismiss("b");
        set.dismiss("a");
        assert_eq!(set.identities(), vec!["a".to_string(), "b".to_string()]);
    }
}
