//! Background connection loop with auto-reconnect.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{FutureExt, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use quill_common::ConnectionState;

use super::connector::{FrameSink, FrameStream};
use super::manager::Shared;

/// Time allowed for a polite close on teardown.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

enum ConnectionEnd {
    Cancelled,
    Lost(String),
}

/// Background task owning the physical connection. Exactly one attempt is
/// outstanding at any time.
pub(super) async fn connection_loop(
    shared: Arc<Shared>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
) {
    let mut delay = shared.reconnect_delay;

    loop {
        if shared.cancel.is_cancelled() {
            break;
        }
        shared.transition(ConnectionState::Connecting);
        info!(url = %shared.url, "connecting to assistant channel");

        let attempt = tokio::select! {
            _ = shared.cancel.cancelled() => break,
            attempt = tokio::time::timeout(
                shared.connect_timeout,
                shared.connector.connect(&shared.url),
            ) => attempt,
        };

        match attempt {
            Ok(Ok((sink, stream))) => {
                delay = shared.reconnect_delay;
                shared.transition(ConnectionState::Open);

                match run_connection(&shared, sink, stream, &mut outbound_rx).await {
                    ConnectionEnd::Cancelled => break,
                    ConnectionEnd::Lost(reason) => {
                        warn!(reason = %reason, "assistant channel lost");
                    }
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "failed to connect to assistant channel");
            }
            Err(_elapsed) => {
                warn!(
                    timeout_ms = shared.connect_timeout.as_millis() as u64,
                    "assistant channel connect timed out"
                );
            }
        }

        // A wake stored while no backoff was pending belongs to no one.
        if shared.wake.notified().now_or_never().is_some() {
            debug!("discarded stale reconnect request");
        }
        shared.transition(ConnectionState::Reconnecting);
        info!(delay_ms = delay.as_millis() as u64, "reconnecting to assistant channel");

        tokio::select! {
            _ = shared.cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
            _ = shared.wake.notified() => {
                debug!("backoff cut short");
            }
        }
        delay = (delay * 2).min(shared.max_reconnect_delay);
    }

    debug!("assistant channel task stopped");
}

async fn run_connection(
    shared: &Shared,
    mut sink: FrameSink,
    mut stream: FrameStream,
    outbound_rx: &mut mpsc::UnboundedReceiver<String>,
) -> ConnectionEnd {
    loop {
        tokio::select! {
            biased;

            _ = shared.cancel.cancelled() => {
                let _ = tokio::time::timeout(CLOSE_GRACE, sink.close()).await;
                return ConnectionEnd::Cancelled;
            }
            inbound = stream.next() => match inbound {
                Some(Ok(text)) => (shared.on_frame)(text),
                Some(Err(e)) => return ConnectionEnd::Lost(e.to_string()),
                None => return ConnectionEnd::Lost("closed by peer".into()),
            },
            Some(frame) = outbound_rx.recv() => {
                if let Err(e) = sink.send(frame).await {
                    return ConnectionEnd::Lost(format!("send failed: {e}"));
                }
            }
        }
    }
}
