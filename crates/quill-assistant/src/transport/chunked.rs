//! One request, newline-delimited JSON fragments until the body closes.

use futures_util::StreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use quill_common::CorrelationId;
use quill_config::TransportKind;

use crate::protocol::{decode_frame, AnswerRequest};
use crate::turn::{Exchange, Fragment};
use crate::AssistantError;

use super::{spawn_exchange, FragmentSink, Transport};

pub struct ChunkedStreamTransport {
    http: reqwest::Client,
    url: String,
    sink: FragmentSink,
    cancel: CancellationToken,
}

impl ChunkedStreamTransport {
    pub fn new(http: reqwest::Client, url: impl Into<String>, sink: FragmentSink) -> Self {
        Self {
            http,
            url: url.into(),
            sink,
            cancel: CancellationToken::new(),
        }
    }
}

/// Read NDJSON frames from `reader` and forward them as fragments.
///
/// Bytes are buffered until a `\n` arrives, so a frame split across reads is
/// parsed exactly once, whole. A final frame without a trailing newline is
/// still parsed at EOF. Malformed frames are logged and skipped. Reading stops
/// at the first terminal frame; if none arrives, EOF emits the end marker.
pub async fn forward_frames<R>(
    mut reader: R,
    correlation_id: &CorrelationId,
    sink: &FragmentSink,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut frames = 0usize;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let Ok(line) = std::str::from_utf8(&buf) else {
            warn!(correlation_id = %correlation_id, "skipping frame with invalid UTF-8");
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let frame = match decode_frame(line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(correlation_id = %correlation_id, error = %e, "skipping malformed frame");
                continue;
            }
        };
        frames += 1;

        let terminal = frame.is_terminal();
        for payload in frame.payloads {
            sink.emit(Fragment {
                correlation_id: correlation_id.clone(),
                payload,
            });
        }
        if terminal {
            debug!(correlation_id = %correlation_id, frames, "stream ended by terminal frame");
            return Ok(());
        }
    }

    debug!(correlation_id = %correlation_id, frames, "stream closed");
    sink.emit(Fragment::end(correlation_id.clone()));
    Ok(())
}

async fn stream_answer(
    http: &reqwest::Client,
    url: &str,
    exchange: &Exchange,
    sink: &FragmentSink,
) -> Result<(), AssistantError> {
    debug!(correlation_id = %exchange.correlation_id, url, "chunked-stream request");

    let response = http
        .post(url)
        .header(reqwest::header::ACCEPT, "application/x-ndjson")
        .json(&AnswerRequest::from(exchange))
        .send()
        .await
        .map_err(|e| AssistantError::TransportFailure(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let text = text.chars().take(200).collect::<String>();
        return Err(AssistantError::TransportFailure(format!(
            "HTTP {status}: {text}"
        )));
    }

    let byte_stream = response
        .bytes_stream()
        .map(|result| result.map_err(std::io::Error::other));
    let reader = StreamReader::new(byte_stream);

    forward_frames(reader, &exchange.correlation_id, sink)
        .await
        .map_err(|e| AssistantError::TransportFailure(e.to_string()))
}

impl Transport for ChunkedStreamTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::ChunkedStream
    }

    fn send(&self, exchange: Exchange) -> Result<(), AssistantError> {
        let http = self.http.clone();
        let url = self.url.clone();
        let sink = self.sink.clone();

        spawn_exchange(&self.cancel, exchange.correlation_id.clone(), async move {
            if let Err(e) = stream_answer(&http, &url, &exchange, &sink).await {
                warn!(correlation_id = %exchange.correlation_id, error = %e, "chunked stream failed");
                sink.emit(Fragment::error(exchange.correlation_id.clone(), e.to_string()));
            }
        })
    }

    fn shutdown(&self) {
        self.cancel.cancel();
    }
}
