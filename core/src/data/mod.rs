//! Persistent configuration for the monitor.

pub mod settings;

pub use settings::{default_settings, load_or_default, resolve_config_dir, SETTINGS_FILE};
