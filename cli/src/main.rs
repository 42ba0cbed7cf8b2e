//! Scoutwatch CLI — the command-line entry point for the monitoring engine.
//!
//! # Usage
//!
//! ```text
//! scoutwatch watch --sessions sessions.json --logs logs.jsonl
//! scoutwatch watch --sessions sessions.json --logs logs.jsonl --events done.jsonl --command 'notify-send "$SCOUTWATCH_SUMMARY"'
//! scoutwatch check --sessions sessions.json --logs logs.jsonl --json
//! scoutwatch settings
//! ```
//!
//! Diagnostics go to stderr, filtered by `SCOUTWATCH_LOG` (default `info`);
//! stdout carries only the feed.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use scoutwatch_core::data::settings;
use scoutwatch_core::infrastructure::file::{FileChangeSubscription, JsonSessionFile, JsonlLogFile};
use scoutwatch_core::infrastructure::sink::{CommandSink, FanoutSink, JsonlSink, LogSink};
use scoutwatch_core::infrastructure::{Clock, LogProvider, SessionProvider, SystemClock};
use scoutwatch_core::types::config::MonitorSettings;
use scoutwatch_core::types::health::Alert;
use scoutwatch_core::{FeedSnapshot, MonitorCycle, MonitorDaemon, Result, SourceUpdate};


#[derive(Parser, Debug)]
#[command(author, version, about = "Session health monitoring and alert correlation")]
struct Cli {
    /// Settings file (default: $SCOUTWATCH_CONFIG_DIR/settings.yaml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Monitor continuously and print the feed whenever it changes
    Watch {
        #[command(flatten)]
        sources: Sources,
        /// Append completion/failure notifications to this JSONL file
        #[arg(long, value_name = "FILE")]
        events: Option<PathBuf>,
        /// Shell command run per notification
        #[arg(long, value_name = "CMD")]
        command: Option<String>,
    },
    /// Run one tick and print the feed
    Check {
        #[command(flatten)]
        sources: Sources,
        /// Print the feed snapshot as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective settings as YAML
    Settings,
}

#[derive(Args, Debug)]
struct Sources {
    /// JSON array of session records
    #[arg(long, value_name = "FILE")]
    sessions: PathBuf,
    /// JSON Lines log file
    #[arg(long, value_name = "FILE")]
    logs: PathBuf,
}


fn main() {
    init_logging();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("scoutwatch: {}", e);
        process::exit(1);
    }
}


fn init_logging() {
    let filter = EnvFilter::try_from_env("SCOUTWATCH_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}


fn run(cli: Cli) -> Result<()> {
    let settings = load_settings(cli.config.as_deref())?;
    match cli.command {
        Command::Watch {
            sources,
            events,
            command,
        } => watch(&settings, &sources, events, command),
        Command::Check { sources, json } => check(&settings, &sources, json),
        Command::Settings => {
            print!("{}", settings::serialize(&settings)?);
            Ok(())
        }
    }
}


fn load_settings(path: Option<&Path>) -> Result<MonitorSettings> {
    match path {
        Some(p) => settings::load(p),
        None => {
            let path = settings::resolve_config_dir().join(settings::SETTINGS_FILE);
            settings::load_or_default(&path)
        }
    }
}


fn watch(
    settings: &MonitorSettings,
    sources: &Sources,
    events: Option<PathBuf>,
    command: Option<String>,
) -> Result<()> {
    let mut sink = FanoutSink::new().with(Box::new(LogSink));
    if let Some(path) = events {
        sink.push(Box::new(JsonlSink::new(path)));
    }
    if let Some(cmd) = command {
        sink.push(Box::new(CommandSink::new(&cmd)));
    }

    let mut last_printed: Option<Vec<Alert>> = None;
    let mut daemon = MonitorDaemon::from_settings(
        settings,
        Box::new(JsonSessionFile::new(&sources.sessions)),
        Box::new(JsonlLogFile::new(&sources.logs)),
    )?
    .with_sink(Box::new(sink))
    .with_observer(Box::new(move |snapshot: &FeedSnapshot| {
        if last_printed.as_ref() != Some(&snapshot.alerts) {
            println!("{}", render_feed(snapshot));
            last_printed = Some(snapshot.alerts.clone());
        }
    }));

    let subscription = FileChangeSubscription::new(
        vec![sources.sessions.clone(), sources.logs.clone()],
        settings.watch_interval_ms,
    );
    daemon.subscribe(&subscription, "file-change")?;

    info!(
        sessions = %sources.sessions.display(),
        logs = %sources.logs.display(),
        "watching"
    );
    daemon.run()
}


fn check(settings: &MonitorSettings, sources: &Sources, json: bool) -> Result<()> {
    let mut cycle = MonitorCycle::from_settings(settings)?;
    let session_file = JsonSessionFile::new(&sources.sessions);
    let log_file = JsonlLogFile::new(&sources.logs);

    let sessions = match session_file.fetch_recent() {
        Ok(batch) => SourceUpdate::Fresh(batch),
        Err(e) => {
            tracing::warn!(error = %e, "session fetch failed");
            SourceUpdate::Failed
        }
    };
    let logs = match log_file.fetch_recent(settings.log_window) {
        Ok(window) => SourceUpdate::Fresh(window),
        Err(e) => {
            tracing::warn!(error = %e, "log fetch failed");
            SourceUpdate::Failed
        }
    };

    let outcome = cycle.tick(sessions, logs, SystemClock.now_ms());
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.snapshot)?);
    } else {
        println!("{}", render_feed(&outcome.snapshot));
    }
    Ok(())
}


fn render_feed(snapshot: &FeedSnapshot) -> String {
    let c = &snapshot.counts;
    let mut out = format!(
        "tick {}: {} sessions ({} running, {} pending, {} completed, {} failed, {} cancelled, {} malformed), {} alerts",
        snapshot.tick,
        c.total,
        c.running,
        c.pending,
        c.completed,
        c.failed,
        c.cancelled,
        c.malformed,
        snapshot.alerts.len()
    );
    for alert in &snapshot.alerts {
        out.push('\n');
        out.push_str(&render_alert(alert));
    }
    out
}


fn render_alert(alert: &Alert) -> String {
    format!(
        "  {:<8} {}: {} [{}]",
        alert.severity.to_string().to_uppercase(),
        alert.title,
        alert.message,
        alert.identity
    )
}
