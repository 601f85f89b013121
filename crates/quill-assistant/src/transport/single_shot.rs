//! One request, one full answer.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use quill_config::TransportKind;

use crate::protocol::{AnswerRequest, AnswerResponse};
use crate::turn::{Exchange, Fragment};
use crate::AssistantError;

use super::{spawn_exchange, FragmentSink, Transport};

pub struct SingleShotTransport {
    http: reqwest::Client,
    url: String,
    sink: FragmentSink,
    cancel: CancellationToken,
}

impl SingleShotTransport {
    pub fn new(http: reqwest::Client, url: impl Into<String>, sink: FragmentSink) -> Self {
        Self {
            http,
            url: url.into(),
            sink,
            cancel: CancellationToken::new(),
        }
    }
}

async fn request_answer(
    http: &reqwest::Client,
    url: &str,
    exchange: &Exchange,
) -> Result<String, AssistantError> {
    debug!(correlation_id = %exchange.correlation_id, url, "single-shot request");

    let response = http
        .post(url)
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

    let body: AnswerResponse = response
        .json()
        .await
        .map_err(|e| AssistantError::TransportFailure(format!("undecodable answer: {e}")))?;
    Ok(body.response)
}

impl Transport for SingleShotTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::SingleShot
    }

    fn send(&self, exchange: Exchange) -> Result<(), AssistantError> {
        let http = self.http.clone();
        let url = self.url.clone();
        let sink = self.sink.clone();

        spawn_exchange(&self.cancel, exchange.correlation_id.clone(), async move {
            let id = exchange.correlation_id.clone();
            match request_answer(&http, &url, &exchange).await {
                Ok(answer) => {
                    sink.emit(Fragment::text(id.clone(), answer));
                    sink.emit(Fragment::end(id));
                }
                Err(e) => {
                    warn!(correlation_id = %id, error = %e, "single-shot request failed");
                    sink.emit(Fragment::error(id, e.to_string()));
                }
            }
        })
    }

    fn shutdown(&self) {
        self.cancel.cancel();
    }
}
