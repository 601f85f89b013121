//! Logging configuration.

use serde::{Deserialize, Serialize};

/// Log level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
#[derive(Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Level name understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    /// Extra `EnvFilter` directives appended after the level, e.g.
    /// `"reqwest=warn,tungstenite=warn"`.
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            filter: None,
        }
    }
}

impl LoggingConfig {
    /// Full filter directive for the quill crates.
    pub fn directive(&self) -> String {
        let level = self.level.as_filter();
        let mut directive = format!("quill={level},quill_assistant={level},quill_config={level}");
        if let Some(extra) = self.filter.as_deref().filter(|f| !f.trim().is_empty()) {
            directive.push(',');
            directive.push_str(extra.trim());
        }
        directive
    }
}
