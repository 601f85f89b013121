//! Answer delivery strategies.
//!
//! Every transport takes an [`Exchange`] and eventually pushes into the
//! session's [`FragmentSink`] either payloads followed by one end marker, or
//! exactly one error, all tagged with the exchange's correlation id. Nothing
//! follows a terminal fragment.

mod chunked;
mod persistent;
mod single_shot;


use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use quill_common::{ClientId, ConnectionState, CorrelationId, EventBus};
use quill_config::{QuillConfig, TransportKind};

use crate::lifecycle::WsConnector;
use crate::turn::{Exchange, Fragment};
use crate::AssistantError;

pub use chunked::{forward_frames, ChunkedStreamTransport};
pub use persistent::PersistentChannelTransport;
pub use single_shot::SingleShotTransport;

/// A question→answer delivery mechanism, selected once per session.
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Start delivering the answer for `exchange`. Returns immediately; the
    /// answer arrives through the fragment sink.
    fn send(&self, exchange: Exchange) -> Result<(), AssistantError>;

    /// Connectivity of a long-lived channel. `None` for request-scoped
    /// transports, which are always ready.
    fn connection_state(&self) -> Option<ConnectionState> {
        None
    }

    /// Abandon in-flight work and release connections. Idempotent.
    fn shutdown(&self);
}

/// Ordered queue of fragments consumed by the session.
#[derive(Debug, Clone)]
pub struct FragmentSink {
    tx: mpsc::UnboundedSender<Fragment>,
}

impl FragmentSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Fragment>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a fragment. Returns `false` once the session stopped listening.
    pub fn emit(&self, fragment: Fragment) -> bool {
        self.tx.send(fragment).is_ok()
    }
}

pub(crate) fn http_client(
    connect_timeout_secs: u32,
    request_timeout_secs: u32,
) -> Result<reqwest::Client, AssistantError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(u64::from(connect_timeout_secs)))
        .timeout(Duration::from_secs(u64::from(request_timeout_secs)))
        .build()
        .map_err(|e| AssistantError::Http(e.to_string()))
}

/// Run one request-scoped exchange on the current runtime. The work is
/// dropped mid-flight when `cancel` fires, so no fragment is emitted after
/// shutdown.
pub(crate) fn spawn_exchange<F>(
    cancel: &CancellationToken,
    correlation_id: CorrelationId,
    work: F,
) -> Result<(), AssistantError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if cancel.is_cancelled() {
        return Err(AssistantError::InvalidState("transport is shut down".into()));
    }
    let runtime = tokio::runtime::Handle::try_current()
        .map_err(|_| AssistantError::TransportFailure("no async runtime available".into()))?;

    let cancel = cancel.child_token();
    runtime.spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(correlation_id = %correlation_id, "exchange abandoned");
            }
            _ = work => {}
        }
    });
    Ok(())
}

/// Build the transport named by `config.assistant.transport`.
///
/// The persistent channel starts connecting immediately, so this must run
/// inside a tokio runtime.
pub fn build_transport(
    config: &QuillConfig,
    client_id: &ClientId,
    sink: FragmentSink,
    events: EventBus,
) -> Result<Arc<dyn Transport>, AssistantError> {
    let assistant = &config.assistant;
    let transport: Arc<dyn Transport> = match assistant.transport {
        TransportKind::SingleShot => Arc::new(SingleShotTransport::new(
            http_client(assistant.connect_timeout_secs, assistant.request_timeout_secs)?,
            assistant.ask_url(),
            sink,
        )),
        TransportKind::ChunkedStream => Arc::new(ChunkedStreamTransport::new(
            http_client(assistant.connect_timeout_secs, assistant.request_timeout_secs)?,
            assistant.stream_url(),
            sink,
        )),
        TransportKind::PersistentChannel => Arc::new(PersistentChannelTransport::connect(
            assistant.channel_url(client_id.as_str()),
            &config.connection,
            Arc::new(WsConnector),
            sink,
            events,
        )?),
    };
    tracing::info!(transport = %assistant.transport, "assistant transport ready");
    Ok(transport)
}
