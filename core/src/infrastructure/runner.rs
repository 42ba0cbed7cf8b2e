//! Command runner abstraction for launching shell hooks.
//!
//! `CommandRunner` is the trait `CommandSink` uses to start its hook.
//! `ShellRunner` is the production implementation that spawns `sh -c` and
//! returns without waiting; a detached thread reaps the child and logs a
//! failed exit. `MockRunner` is the test double that records calls and
//! returns preset responses.

use std::process::{Child, Command, Stdio};
use std::sync::Mutex;
use std::thread;

use tracing::{debug, warn};

use crate::error::{MonitorError, Result};

/// Trait for launching shell command strings with extra environment variables.
///
/// `spawn` returns once the command has started. An error means it could not
/// be started at all; how it later exits is not reported to the caller.
pub trait CommandRunner: Send {
    fn spawn(&self, cmd: &str, env: &[(&str, &str)]) -> Result<()>;
}

/// Production runner that spawns `sh -c <cmd>`.
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn spawn(&self, cmd: &str, env: &[(&str, &str)]) -> Result<()> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .envs(env.iter().copied())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;
        let label = cmd.to_string();
        thread::Builder::new()
            .name("scoutwatch-hook".into())
            .spawn(move || reap(&label, child))?;
        Ok(())
    }
}

fn reap(cmd: &str, child: Child) {
    match child.wait_with_output() {
        Ok(output) if output.status.success() => {
            debug!(command = cmd, "hook finished");
        }
        Ok(output) => warn!(
            command = cmd,
            status = %output.status,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "hook failed"
        ),
        Err(e) => warn!(command = cmd, error = %e, "hook could not be awaited"),
    }
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCommand {
    pub cmd: String,
    pub env: Vec<(String, String)>,
}

/// Test-double runner that records commands and returns pre-configured responses.
/// An `Err` response stands for a command that could not be started.
pub struct MockRunner {
    responses: Mutex<Vec<std::result::Result<(), String>>>,
    commands: Mutex<Vec<RecordedCommand>>,
}

impl MockRunner {
    pub fn with_responses(responses: Vec<std::result::Result<(), String>>) -> Self {
        let mut reversed = responses;
        reversed.reverse();
        MockRunner {
            responses: Mutex::new(reversed),
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    pub fn executed_commands(&self) -> Vec<RecordedCommand> {
        match self.commands.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for MockRunner {
    fn spawn(&self, cmd: &str, env: &[(&str, &str)]) -> Result<()> {
        let record = RecordedCommand {
            cmd: cmd.to_string(),
            env: env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        };
        match self.commands.lock() {
            Ok(mut guard) => guard.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
        let response = match self.responses.lock() {
            Ok(mut guard) => guard.pop(),
            Err(poisoned) => poisoned.into_inner().pop(),
        };
        match response {
            Some(Err(msg)) => Err(MonitorError::Sink(msg)),
            Some(Ok(())) | None => Ok(()),
        }
    }
}
