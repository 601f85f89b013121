//! Assistant chat client for the Quill blog widget.
//!
//! Delivers answers from the answer service as they are generated:
//! - Fragment assembly into a single growing answer turn
//! - Three interchangeable transports (single-shot, chunked NDJSON
//!   streaming, persistent WebSocket channel)
//! - Connection lifecycle with automatic reconnect for the channel
//! - A conversation session that serializes exchanges and routes
//!   fragments by correlation id

pub mod lifecycle;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod turn;

pub use lifecycle::{ConnectionManager, Connector, WsConnector};
pub use session::{ConversationSession, IngestOutcome};
pub use transport::{build_transport, FragmentSink, Transport};
pub use turn::{ContextTurn, Exchange, Fragment, FragmentPayload, Turn};

pub use quill_common::{ClientId, ConnectionState, CorrelationId, Role, TurnStatus};
pub use quill_config::TransportKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssistantError {
    /// Caller misuse: concurrent ask, empty question, closed session.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Network or channel failure before or while receiving an answer.
    #[error("transport failure: {0}")]
    TransportFailure(String),
    /// The answer service reported an error for the exchange.
    #[error("stream error: {0}")]
    StreamError(String),
    /// The persistent channel is not open.
    #[error("channel unavailable")]
    ChannelUnavailable,
    #[error("malformed frame: {0}")]
    MalformedFrame(String),
    #[error("http client error: {0}")]
    Http(String),
}
