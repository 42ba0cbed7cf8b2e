use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{MonitorError, Result};
use crate::types::config::MonitorSettings;


/// File name of the settings document inside the config directory.
pub const SETTINGS_FILE: &str = "settings.yaml";


/// Returns the built-in defaults.
pub fn default_settings() -> MonitorSettings {
    MonitorSettings::default()
}


/// Resolve the config directory: `SCOUTWATCH_CONFIG_DIR` if set, otherwise
/// `$HOME/.config/scoutwatch`.
pub fn resolve_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SCOUTWATCH_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(home).join(".config").join("scoutwatch")
}


/// Load and validate settings from a YAML file.
pub fn load(path: &Path) -> Result<MonitorSettings> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        MonitorError::Settings(format!("cannot read {}: {}", path.display(), e))
    })?;
    parse(&content)
}


/// Load settings from `path`, falling back to defaults when the file is absent.
pub fn load_or_default(path: &Path) -> Result<MonitorSettings> {
    if !path.exists() {
        debug!(path = %path.display(), "settings file absent, using defaults");
        return Ok(default_settings());
    }
    load(path)
}


/// Save settings as YAML, creating parent directories.
pub fn save(path: &Path, settings: &MonitorSettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serialize(settings)?)?;
    Ok(())
}


/// Parse and validate settings from a YAML string. An empty document yields
/// the defaults.
pub fn parse(content: &str) -> Result<MonitorSettings> {
    let settings = if content.trim().is_empty() {
        default_settings()
    } else {
        serde_yaml::from_str::<MonitorSettings>(content)?
    };
    validate(&settings)?;
    Ok(settings)
}


pub fn serialize(settings: &MonitorSettings) -> Result<String> {
    Ok(serde_yaml::to_string(settings)?)
}


/// Reject settings the engine cannot run with.
pub fn validate(s: &MonitorSettings) -> Result<()> {
    if s.warn_after_ms == 0 {
        return Err(MonitorError::Settings("warn_after_ms must be positive".into()));
    }
    if s.warn_after_ms >= s.crit_after_ms {
        return Err(MonitorError::Settings(format!(
            "warn_after_ms ({}) must be below crit_after_ms ({})",
            s.warn_after_ms, s.crit_after_ms
        )));
    }
    if s.log_window == 0 {
        return Err(MonitorError::Settings("log_window must be positive".into()));
    }
    if s.repeated_error_threshold == 0 {
        return Err(MonitorError::Settings(
            "repeated_error_threshold must be positive".into(),
        ));
    }
    if s.active_poll_interval_ms == 0 {
        return Err(MonitorError::Settings(
            "active_poll_interval_ms must be positive".into(),
        ));
    }
    if s.log_poll_interval_ms == 0 {
        return Err(MonitorError::Settings(
            "log_poll_interval_ms must be positive".into(),
        ));
    }
    Ok(())
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
