//! Monitoring engine — detection, correlation, ranking, and notification.
//!
//! The `snapshot` module holds the latest session batch.
//! The `heartbeat` module classifies running sessions by time since their
//! last update, and `correlator` scans the recent log window against the
//! rows of a `signatures` table.
//! `dismissal` filters acknowledged identities, `feed` ranks and publishes
//! the survivors, and `transition` emits completion/failure notifications.
//! The `cycle` module composes all of them into one committed tick.

pub mod correlator;
pub mod cycle;
pub mod dismissal;
pub mod feed;
pub mod heartbeat;
pub mod signatures;
pub mod snapshot;
pub mod transition;
