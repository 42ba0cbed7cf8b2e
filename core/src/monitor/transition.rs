//! Transition notifier — fires once per observed running → completed/failed.
//!
//! The notifier remembers the last status it saw for each session id still
//! in the batch, plus running sessions that recently dropped out of it. A
//! notification is emitted only when that remembered status was `running` and
//! the new one is `completed` or `failed`; a session seen for the first time
//! never notifies, whatever its status.
//!
//! Updating is split in two so a tick can be discarded before it commits:
//! `plan` computes the events and the new statuses without touching state,
//! and `commit` applies the statuses.

use std::collections::{HashMap, HashSet};

use crate::types::notification::{NotificationEvent, NotificationKind};
use crate::types::session::{Session, SessionStatus};


/// Committed batches a running session may stay out of the batch before its
/// memory is dropped.
pub const RUNNING_ABSENCE_LIMIT: u64 = 1_000;


/// The outcome of diffing one batch against remembered statuses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionPlan {
    pub events: Vec<NotificationEvent>,
    /// Status to remember for each well-formed session in the batch.
    pub updates: Vec<(String, SessionStatus)>,
    /// Remembered ids to drop on commit.
    pub forget: Vec<String>,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Remembered {
    status: SessionStatus,
    /// Value of `batches` when the session was last in a batch.
    seen: u64,
}


#[derive(Debug, Clone, Default)]
pub struct TransitionNotifier {
    previous: HashMap<String, Remembered>,
    batches: u64,
}

impl TransitionNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff `sessions` against remembered statuses. Malformed sessions (no
    /// status or no last update) are left out of both the events and the
    /// updates.
    ///
    /// Remembered sessions missing from the batch are scheduled for removal
    /// unless they were running; a running one is kept until it has been
    /// absent for `RUNNING_ABSENCE_LIMIT` batches, so it can still notify
    /// when it comes back finished.
    pub fn plan(&self, sessions: &[&Session], now_ms: u64) -> TransitionPlan {
        let mut plan = TransitionPlan::default();
        for session in sessions {
            if session.is_malformed() {
                continue;
            }
            let current = match session.status {
                Some(status) => status,
                None => continue,
            };
            let was_running = self
                .previous
                .get(&session.id)
                .map_or(false, |r| r.status == SessionStatus::Running);
            if was_running {
                let kind = match current {
                    SessionStatus::Completed => Some(NotificationKind::Completed),
                    SessionStatus::Failed => Some(NotificationKind::Failed),
                    _ => None,
                };
                if let Some(kind) = kind {
                    plan.events.push(NotificationEvent {
                        session_id: session.id.clone(),
                        kind,
                        summary: summarize(session, kind),
                        timestamp_ms: session.completed_ms.unwrap_or(now_ms),
                    });
                }
            }
            plan.updates.push((session.id.clone(), current));
        }

        let present: HashSet<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        let batch = self.batches + 1;
        for (id, remembered) in &self.previous {
            if present.contains(id.as_str()) {
                continue;
            }
            let expired = batch - remembered.seen >= RUNNING_ABSENCE_LIMIT;
            if remembered.status != SessionStatus::Running || expired {
                plan.forget.push(id.clone());
            }
        }
        plan.forget.sort();
        plan
    }

    /// Apply `plan`: remember the new statuses and drop the ids it forgets.
    pub fn commit(&mut self, plan: &TransitionPlan) {
        self.batches += 1;
        for (id, status) in &plan.updates {
            self.previous.insert(
                id.clone(),
                Remembered {
                    status: *status,
                    seen: self.batches,
                },
            );
        }
        for id in &plan.forget {
            self.previous.remove(id);
        }
    }

    pub fn previous_status(&self, id: &str) -> Option<SessionStatus> {
        self.previous.get(id).map(|r| r.status)
    }

    /// Number of sessions with a remembered status.
    pub fn tracked(&self) -> usize {
        self.previous.len()
    }
}


fn summarize(session: &Session, kind: NotificationKind) -> String {
    match kind {
        NotificationKind::Completed => {
            let m = &session.metrics;
            format!(
                "Scouting session {} completed: {} sites examined, {} items found, {} approved, {} discarded",
                session.id, m.sites_examined, m.items_found, m.items_approved, m.items_discarded
            )
        }
        NotificationKind::Failed => {
            let reason = session
                .error_message
                .as_deref()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or("no error message recorded");
            match &session.phase {
                Some(phase) => format!(
                    "Scouting session {} failed during {}: {}",
                    session.id, phase, reason
                ),
                None => format!("Scouting session {} failed: {}", session.id, reason),
            }
        }
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: &str, status: SessionStatus) -> Session {
        Session::new(id, status, 1_000)
    }

    /// Plan and commit in one step, like a completed tick.
    fn tick(notifier: &mut TransitionNotifier, sessions: &[Session]) -> Vec<NotificationEvent> {
        let refs: Vec<&Session> = sessions.iter().collect();
        let plan = notifier.plan(&refs, 5_000);
        notifier.commit(&plan);
        plan.events
    }

    #[test]
    fn running_to_completed_fires_once() {
        let mut n = TransitionNotifier::new();
        assert!(tick(&mut n, &[session("S3", SessionStatus::Running)]).is_empty());

        let events = tick(&mut n, &[session("S3", SessionStatus::Completed)]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].session_id, "S3");
        assert_eq!(events[0].kind, NotificationKind::Completed);

        assert!(tick(&mut n, &[session("S3", SessionStatus::Completed)]).is_empty());
        assert!(tick(&mut n, &[session("S3", SessionStatus::Completed)]).is_empty());
    }

    #[test]
    fn running_to_failed_uses_error_message() {
        let mut n = TransitionNotifier::new();
        tick(&mut n, &[session("s1", SessionStatus::Running)]);
        let mut failed = session("s1", SessionStatus::Failed);
        failed.error_message = Some("search API key revoked".into());
        failed.phase = Some("enrichment".into());
        let events = tick(&mut n, &[failed]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, NotificationKind::Failed);
        assert_eq!(
            events[0].summary,
            "Scouting session s1 failed during enrichment: search API key revoked"
        );
    }

    #[test]
    fn failure_without_message_says_so() {
        let mut n = TransitionNotifier::new();
        tick(&mut n, &[session("s1", SessionStatus::Running)]);
        let events = tick(&mut n, &[session("s1", SessionStatus::Failed)]);
        assert!(events[0].summary.ends_with("no error message recorded"));
    }

    #[test]
    fn completed_summary_reports_metrics() {
        let mut n = TransitionNotifier::new();
        tick(&mut n, &[session("s1", SessionStatus::Running)]);
        let mut done = session("s1", SessionStatus::Completed);
        done.metrics.sites_examined = 40;
        done.metrics.items_found = 12;
        done.metrics.items_approved = 5;
        done.metrics.items_discarded = 7;
        done.completed_ms = Some(4_200);
        let events = tick(&mut n, &[done]);
        assert_eq!(
            events[0].summary,
            "Scouting session s1 completed: 40 sites examined, 12 items found, 5 approved, 7 discarded"
        );
        assert_eq!(events[0].timestamp_ms, 4_200);
    }

    #[test]
    fn first_sighting_never_fires() {
        let mut n = TransitionNotifier::new();
        let events = tick(
            &mut n,
            &[
                session("a", SessionStatus::Completed),
                session("b", SessionStatus::Failed),
            ],
        );
        assert!(events.is_empty());
        assert_eq!(n.tracked(), 2);
    }

    #[test]
    fn cancelled_and_pending_do_not_fire() {
        let mut n = TransitionNotifier::new();
        tick(&mut n, &[session("a", SessionStatus::Running)]);
        assert!(tick(&mut n, &[session("a", SessionStatus::Cancelled)]).is_empty());

        tick(&mut n, &[session("b", SessionStatus::Pending)]);
        assert!(tick(&mut n, &[session("b", SessionStatus::Completed)]).is_empty());
    }

    #[test]
    fn rerun_after_terminal_is_a_new_cycle() {
        let mut n = TransitionNotifier::new();
        tick(&mut n, &[session("a", SessionStatus::Running)]);
        assert_eq!(tick(&mut n, &[session("a", SessionStatus::Completed)]).len(), 1);
        tick(&mut n, &[session("a", SessionStatus::Running)]);
        assert_eq!(tick(&mut n, &[session("a", SessionStatus::Failed)]).len(), 1);
    }

    #[test]
    fn plan_without_commit_changes_nothing() {
        let mut n = TransitionNotifier::new();
        tick(&mut n, &[session("a", SessionStatus::Running)]);
        let done = [session("a", SessionStatus::Completed)];
        let refs: Vec<&Session> = done.iter().collect();
        let discarded = n.plan(&refs, 0);
        assert_eq!(discarded.events.len(), 1);
        assert_eq!(n.previous_status("a"), Some(SessionStatus::Running));
        assert_eq!(tick(&mut n, &done).len(), 1);
    }

    #[test]
    fn missing_status_is_skipped() {
        let mut n = TransitionNotifier::new();
        tick(&mut n, &[session("a", SessionStatus::Running)]);
        let mut broken = session("a", SessionStatus::Completed);
        broken.status = None;
        assert!(tick(&mut n, &[broken]).is_empty());
        assert_eq!(n.previous_status("a"), Some(SessionStatus::Running));
    }

    #[test]
    fn missing_heartbeat_is_skipped() {
        let mut n = TransitionNotifier::new();
        tick(&mut n, &[session("m", SessionStatus::Running)]);
        let mut broken = session("m", SessionStatus::Completed);
        broken.last_updated_ms = None;
        assert!(tick(&mut n, &[broken]).is_empty());
        assert_eq!(n.previous_status("m"), Some(SessionStatus::Running));

        // Once the record is whole again the pending completion fires.
        assert_eq!(tick(&mut n, &[session("m", SessionStatus::Completed)]).len(), 1);
    }

    #[test]
    fn absent_sessions_keep_memory() {
        let mut n = TransitionNotifier::new();
        tick(&mut n, &[session("a", SessionStatus::Running)]);
        tick(&mut n, &[]);
        assert_eq!(tick(&mut n, &[session("a", SessionStatus::Completed)]).len(), 1);
    }

    #[test]
    fn absent_finished_sessions_are_forgotten() {
        let mut n = TransitionNotifier::new();
        tick(
            &mut n,
            &[
                session("done", SessionStatus::Completed),
                session("live", SessionStatus::Running),
                session("queued", SessionStatus::Pending),
            ],
        );
        assert_eq!(n.tracked(), 3);

        tick(&mut n, &[]);
        assert_eq!(n.tracked(), 1);
        assert_eq!(n.previous_status("done"), None);
        assert_eq!(n.previous_status("queued"), None);
        assert_eq!(n.previous_status("live"), Some(SessionStatus::Running));

        // A forgotten session coming back is a first sighting.
        assert!(tick(&mut n, &[session("queued", SessionStatus::Completed)]).is_empty());
    }

    #[test]
    fn present_malformed_session_is_not_forgotten() {
        let mut n = TransitionNotifier::new();
        tick(&mut n, &[session("a", SessionStatus::Completed)]);
        let mut broken = session("a", SessionStatus::Completed);
        broken.status = None;
        tick(&mut n, &[broken]);
        assert_eq!(n.previous_status("a"), Some(SessionStatus::Completed));
    }

    #[test]
    fn long_absent_running_session_is_dropped() {
        let mut n = TransitionNotifier::new();
        tick(&mut n, &[session("a", SessionStatus::Running)]);
        for _ in 0..RUNNING_ABSENCE_LIMIT - 1 {
            tick(&mut n, &[]);
        }
        assert_eq!(n.previous_status("a"), Some(SessionStatus::Running));
        assert_eq!(tick(&mut n, &[session("a", SessionStatus::Completed)]).len(), 1);

        tick(&mut n, &[session("b", SessionStatus::Running)]);
        for _ in 0..RUNNING_ABSENCE_LIMIT {
            tick(&mut n, &[]);
        }
        assert_eq!(n.previous_status("b"), None);
        assert_eq!(n.tracked(), 0);
    }
}
