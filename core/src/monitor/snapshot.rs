//! Session snapshot store — the latest full batch reported by the provider.
//!
//! Each ingest replaces the view wholesale; the provider always supplies the
//! complete current set, so there is no merging and no tombstoning.

use std::collections::BTreeMap;

use crate::types::session::{Session, SessionCounts, SessionStatus};


#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    /// Keyed by session id; BTreeMap keeps `list()` deterministic.
    sessions: BTreeMap<String, Session>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current view with `sessions`. A later duplicate id in the
    /// same batch overwrites an earlier one.
    pub fn ingest(&mut self, sessions: Vec<Session>) {
        self.sessions = sessions
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
    }

    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// All sessions, ordered by id.
    pub fn list(&self) -> Vec<&Session> {
        self.sessions.values().collect()
    }

    pub fn running(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values().filter(|s| s.is_running())
    }

    pub fn any_running(&self) -> bool {
        self.running().next().is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Tally sessions by status. Malformed records count once, under
    /// `malformed`, and not under their status.
    pub fn counts(&self) -> SessionCounts {
        let mut counts = SessionCounts {
            total: self.sessions.len(),
            ..SessionCounts::default()
        };
        for session in self.sessions.values() {
            if session.is_malformed() {
                counts.malformed += 1;
                continue;
            }
            match session.status {
                Some(SessionStatus::Pending) => counts.pending += 1,
                Some(SessionStatus::Running) => counts.running += 1,
                Some(SessionStatus::Completed) => counts.completed += 1,
                Some(SessionStatus::Failed) => counts.failed += 1,
                Some(SessionStatus::Cancelled) => counts.cancelled += 1,
                None => {}
            }
        }
        counts
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_replaces_previous_batch() {
        let mut store = SnapshotStore::new();
        store.ingest(vec![
            Session::new("a", SessionStatus::Running, 1),
            Session::new("b", SessionStatus::Pending, 1),
        ]);
        assert_eq!(store.len(), 2);

        store.ingest(vec![Session::new("c", SessionStatus::Completed, 2)]);
        assert_eq!(store.len(), 1);
        assert!(store.get("a").is_none());
        assert!(store.get("c").is_some());
    }

    #[test]
    fn duplicate_ids_keep_last() {
        let mut store = SnapshotStore::new();
        store.ingest(vec![
            Session::new("a", SessionStatus::Running, 1),
            Session::new("a", SessionStatus::Failed, 2),
        ]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().status, Some(SessionStatus::Failed));
    }

    #[test]
    fn list_is_ordered_by_id() {
        let mut store = SnapshotStore::new();
        store.ingest(vec![
            Session::new("zeta", SessionStatus::Running, 1),
            Session::new("alpha", SessionStatus::Running, 1),
        ]);
        let ids: Vec<&str> = store.list().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "zeta"]);
    }

    #[test]
    fn counts_by_status() {
        let mut store = SnapshotStore::new();
        let mut broken = Session::new("x", SessionStatus::Running, 1);
        broken.last_updated_ms = None;
        store.ingest(vec![
            Session::new("a", SessionStatus::Running, 1),
            Session::new("b", SessionStatus::Running, 1),
            Session::new("c", SessionStatus::Failed, 1),
            Session::new("d", SessionStatus::Cancelled, 1),
            broken,
        ]);
        let counts = store.counts();
        assert_eq!(counts.total, 5);
        assert_eq!(counts.running, 2);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.cancelled, 1);
        assert_eq!(counts.malformed, 1);
        assert!(store.any_running());
    }

    #[test]
    fn empty_store() {
        let store = SnapshotStore::new();
        assert!(store.is_empty());
        assert!(!store.any_running());
        assert_eq!(store.counts(), SessionCounts::default());
    }
}
