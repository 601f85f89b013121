//! Establishing the physical connection.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{future, Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::debug;

use crate::AssistantError;

/// Outbound half of a connection: text frames.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = AssistantError> + Send>>;
/// Inbound half of a connection: text frames until the peer goes away.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, AssistantError>> + Send>>;

/// Opens one physical connection to `url`.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream), AssistantError>;
}

/// WebSocket connector over `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<(FrameSink, FrameStream), AssistantError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| AssistantError::TransportFailure(e.to_string()))?;

        let (ws_write, ws_read) = ws_stream.split();

        let sink = ws_write
            .sink_map_err(|e| AssistantError::TransportFailure(e.to_string()))
            .with(|text: String| future::ready(Ok::<_, AssistantError>(WsMessage::Text(text.into()))));

        let stream = ws_read.filter_map(|message| {
            future::ready(match message {
                Ok(WsMessage::Text(text)) => Some(Ok(text.to_string())),
                Ok(WsMessage::Close(frame)) => {
                    debug!(?frame, "assistant channel close frame received");
                    None
                }
                Ok(_) => None,
                Err(e) => Some(Err(AssistantError::TransportFailure(e.to_string()))),
            })
        });

        Ok((Box::pin(sink), Box::pin(stream)))
    }
}
