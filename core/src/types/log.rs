use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    #[serde(alias = "warn")]
    Warning,
    Error,
}

/// One emitted log line, optionally tied to a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub id: String,
    /// `None` for system-wide lines.
    #[serde(default)]
    pub session_id: Option<String>,
    pub timestamp_ms: u64,
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// Lowercased message plus the JSON text of `details`, the haystack
    /// signature matching runs against.
    pub fn search_text(&self) -> String {
        let mut text = self.message.to_lowercase();
        if let Some(details) = &self.details {
            text.push('\n');
            text.push_str(&details.to_string().to_lowercase());
        }
        text
    }
}
