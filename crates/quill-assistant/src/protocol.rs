//! Answer service wire protocol.
//!
//! Requests carry the question and prior turns. Streamed answers arrive as
//! JSON frames shaped `{"chunk": ..}`, `{"error": ..}` or `{"complete": true}`,
//! newline-delimited over HTTP or one per WebSocket text message.

use serde::{Deserialize, Serialize};

use quill_common::CorrelationId;

use crate::turn::{ContextTurn, Exchange, FragmentPayload};
use crate::AssistantError;

/// Body of single-shot and chunked-stream requests.
#[derive(Debug, Serialize)]
pub struct AnswerRequest<'a> {
    pub current_request: &'a str,
    pub previous_context: &'a [ContextTurn],
}

impl<'a> From<&'a Exchange> for AnswerRequest<'a> {
    fn from(exchange: &'a Exchange) -> Self {
        Self {
            current_request: &exchange.question,
            previous_context: &exchange.history,
        }
    }
}

/// Outbound message on the persistent channel.
#[derive(Debug, Serialize)]
pub struct ChannelRequest<'a> {
    pub correlation_id: &'a CorrelationId,
    #[serde(flatten)]
    pub request: AnswerRequest<'a>,
}

impl<'a> From<&'a Exchange> for ChannelRequest<'a> {
    fn from(exchange: &'a Exchange) -> Self {
        Self {
            correlation_id: &exchange.correlation_id,
            request: AnswerRequest::from(exchange),
        }
    }
}

/// Single-shot response body.
#[derive(Debug, Deserialize)]
pub struct AnswerResponse {
    pub response: String,
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(default)]
    correlation_id: Option<CorrelationId>,
    #[serde(default)]
    chunk: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    complete: bool,
}

/// A decoded streamed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFrame {
    /// Present only when the service echoes the exchange identity.
    pub correlation_id: Option<CorrelationId>,
    pub payloads: Vec<FragmentPayload>,
}

impl AnswerFrame {
    pub fn is_terminal(&self) -> bool {
        self.payloads.iter().any(FragmentPayload::is_terminal)
    }
}

/// Decode one frame. An `error` wins over everything else in the same frame;
/// a `chunk` with `complete: true` yields the text followed by the end marker.
pub fn decode_frame(text: &str) -> Result<AnswerFrame, AssistantError> {
    let raw: RawFrame =
        serde_json::from_str(text).map_err(|e| AssistantError::MalformedFrame(e.to_string()))?;

    let payloads = match (raw.error, raw.chunk, raw.complete) {
        (Some(error), _, _) => vec![FragmentPayload::Error(error)],
        (None, Some(chunk), false) => vec![FragmentPayload::Text(chunk)],
        (None, Some(chunk), true) => vec![FragmentPayload::Text(chunk), FragmentPayload::End],
        (None, None, true) => vec![FragmentPayload::End],
        (None, None, false) => {
            return Err(AssistantError::MalformedFrame(
                "frame has no chunk, error or complete field".into(),
            ))
        }
    };

    Ok(AnswerFrame {
        correlation_id: raw.correlation_id,
        payloads,
    })
}
