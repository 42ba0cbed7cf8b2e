//! Scoutwatch core — health monitoring and alert correlation for long-running
//! scouting sessions.
//!
//! Session snapshots and a recent log window go in; a ranked, dismissable
//! alert feed and one-shot completion/failure notifications come out. The
//! `monitor` module holds the detectors and the `MonitorCycle` that composes
//! them into a tick, `daemon` schedules ticks, and `infrastructure` holds the
//! provider, sink, and clock seams with their file-backed and mock
//! implementations.

pub mod daemon;
pub mod data;
pub mod error;
pub mod infrastructure;
pub mod monitor;
pub mod types;

pub use daemon::{DaemonConfig, MonitorDaemon, MonitorEvent, MonitorHandle};
pub use error::{MonitorError, Result};
pub use monitor::cycle::{MonitorCycle, SourceUpdate, TickOutcome};
pub use monitor::feed::{AlertFeed, FeedSnapshot};
