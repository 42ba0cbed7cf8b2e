//! Notification sinks.
//!
//! `LogSink` writes events to the tracing log, `JsonlSink` appends them to a
//! JSON Lines file, `CommandSink` launches a shell hook per event without
//! waiting for it, and `FanoutSink` delivers to several sinks at once.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::Result;
use crate::types::notification::NotificationEvent;

use super::runner::{CommandRunner, ShellRunner};
use super::NotificationSink;


/// Emits each event as an `info!` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, event: &NotificationEvent) -> Result<()> {
        info!(
            session = %event.session_id,
            kind = %event.kind,
            "{}",
            event.summary
        );
        Ok(())
    }
}


/// Appends each event as one JSON line, creating parent directories.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonlSink { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl NotificationSink for JsonlSink {
    fn notify(&self, event: &NotificationEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(event)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}


/// Launches a shell command per event. The event is passed in the
/// `SCOUTWATCH_SESSION`, `SCOUTWATCH_KIND`, and `SCOUTWATCH_SUMMARY`
/// environment variables.
///
/// `notify` returns as soon as the command has started, so a slow hook never
/// holds up the caller. Only a failure to start is returned; a non-zero exit
/// is logged with `warn!` when the command finishes.
pub struct CommandSink {
    command: String,
    runner: Box<dyn CommandRunner>,
}

impl CommandSink {
    /// Sink that runs `command` through `sh -c`.
    pub fn new(command: &str) -> Self {
        Self::with_runner(command, Box::new(ShellRunner))
    }

    /// Sink that hands `command` to `runner` instead of the shell.
    pub fn with_runner(command: &str, runner: Box<dyn CommandRunner>) -> Self {
        CommandSink {
            command: command.to_string(),
            runner,
        }
    }
}

impl NotificationSink for CommandSink {
    fn notify(&self, event: &NotificationEvent) -> Result<()> {
        self.runner.spawn(
            &self.command,
            &[
                ("SCOUTWATCH_SESSION", event.session_id.as_str()),
                ("SCOUTWATCH_KIND", event.kind.as_str()),
                ("SCOUTWATCH_SUMMARY", event.summary.as_str()),
            ],
        )
    }
}


/// Delivers to every inner sink in order. Every sink is tried; the first
/// failure is returned after the rest have run.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: Box<dyn NotificationSink>) {
        self.sinks.push(sink);
    }

    pub fn with(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl NotificationSink for FanoutSink {
    fn notify(&self, event: &NotificationEvent) -> Result<()> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.notify(event) {
                warn!(session = %event.session_id, error = %e, "sink failed");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
