//! Assistant chat widget configuration: transport selection and endpoints.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How answers are delivered from the answer service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[derive(Default)]
pub enum TransportKind {
    /// One request, one full answer.
    SingleShot,
    /// One request, newline-delimited JSON fragments until the body closes.
    #[default]
    ChunkedStream,
    /// A long-lived WebSocket carrying many exchanges.
    PersistentChannel,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleShot => "single-shot",
            Self::ChunkedStream => "chunked-stream",
            Self::PersistentChannel => "persistent-channel",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single-shot" | "single" => Ok(Self::SingleShot),
            "chunked-stream" | "chunked" | "stream" => Ok(Self::ChunkedStream),
            "persistent-channel" | "persistent" | "websocket" => Ok(Self::PersistentChannel),
            other => Err(format!(
                "unknown transport '{other}' (expected single-shot, chunked-stream or persistent-channel)"
            )),
        }
    }
}

/// Assistant configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub transport: TransportKind,
    /// Base URL of the answer service (http or https).
    pub base_url: String,
    /// Path of the single-shot endpoint.
    pub ask_path: String,
    /// Path of the chunked streaming endpoint.
    pub stream_path: String,
    /// Path prefix of the persistent channel; the client id is appended.
    pub channel_path: String,
    /// Whole-request timeout in seconds (valid range: 1-600).
    pub request_timeout_secs: u32,
    /// HTTP connect timeout in seconds (valid range: 1-120).
    pub connect_timeout_secs: u32,
    /// Most recent completed turns sent as context (valid range: 0-200).
    pub max_context_turns: u32,
    /// Shown on a failed answer turn.
    pub failure_message: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            base_url: "http://localhost:8000".into(),
            ask_path: "/chat".into(),
            stream_path: "/chat/stream".into(),
            channel_path: "/ws".into(),
            request_timeout_secs: 120,
            connect_timeout_secs: 10,
            max_context_turns: 20,
            failure_message: "Sorry, I couldn't get an answer right now. Please try again.".into(),
        }
    }
}

impl AssistantConfig {
    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn ask_url(&self) -> String {
        format!("{}{}", self.base(), self.ask_path)
    }

    pub fn stream_url(&self) -> String {
        format!("{}{}", self.base(), self.stream_path)
    }

    /// WebSocket URL of the persistent channel for one client.
    pub fn channel_url(&self, client_id: &str) -> String {
        let base = self.base();
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!(
            "{ws_base}{}/{client_id}",
            self.channel_path.trim_end_matches('/')
        )
    }
}
