//! The conversation actor the presentation layer talks to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use quill_common::{ClientId, ConnectionState, CorrelationId, Event, EventBus, Role, TurnStatus};
use quill_config::{AssistantConfig, QuillConfig, TransportKind};

use crate::transport::{build_transport, FragmentSink, Transport};
use crate::turn::{Fragment, Turn};
use crate::AssistantError;

use super::transcript::Transcript;

const CLOSED_REASON: &str = "conversation closed";

/// One visitor's conversation with the assistant.
///
/// Exchanges are serialized: a new question is accepted only once the
/// previous answer is complete or failed. Answers stream into the history
/// in the background; watch progress through [`subscribe`](Self::subscribe).
pub struct ConversationSession {
    client_id: ClientId,
    transcript: Arc<Mutex<Transcript>>,
    transport: Arc<dyn Transport>,
    events: EventBus,
    stop: CancellationToken,
    closed: AtomicBool,
}

impl ConversationSession {
    /// Start a session with the transport named in `config`.
    ///
    /// Must run inside a tokio runtime.
    pub fn connect(config: &QuillConfig) -> Result<Self, AssistantError> {
        let events = EventBus::default();
        let transport_events = events.clone();
        Self::with_transport(&config.assistant, events, |sink, client_id| {
            build_transport(config, client_id, sink, transport_events)
        })
    }

    /// Start a session around a transport produced by `build`, which
    /// receives the session's fragment sink and client id.
    pub fn with_transport<F>(
        config: &AssistantConfig,
        events: EventBus,
        build: F,
    ) -> Result<Self, AssistantError>
    where
        F: FnOnce(FragmentSink, &ClientId) -> Result<Arc<dyn Transport>, AssistantError>,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| AssistantError::TransportFailure("no async runtime available".into()))?;

        let client_id = ClientId::new();
        let (sink, fragments) = FragmentSink::channel();
        let transport = build(sink, &client_id)?;

        let transcript = Arc::new(Mutex::new(Transcript::new(
            config.max_context_turns as usize,
            config.failure_message.clone(),
        )));
        let stop = CancellationToken::new();
        runtime.spawn(pump(
            fragments,
            Arc::clone(&transcript),
            events.clone(),
            stop.clone(),
        ));

        info!(client_id = %client_id, transport = %transport.kind(), "conversation session started");

        Ok(Self {
            client_id,
            transcript,
            transport,
            events,
            stop,
            closed: AtomicBool::new(false),
        })
    }

    /// Submit a question. Returns the exchange's correlation id as soon as
    /// the transport accepted it; the answer streams in afterwards.
    pub fn ask(&self, question: &str) -> Result<CorrelationId, AssistantError> {
        let mut transcript = self.lock();
        let (exchange, slots) = transcript.begin_exchange(question)?;
        let correlation_id = exchange.correlation_id.clone();

        if let Err(e) = self.transport.send(exchange) {
            warn!(correlation_id = %correlation_id, error = %e, "transport rejected question");
            transcript.rollback(&correlation_id, slots);
            return Err(e);
        }

        self.events.publish(Event::TurnAppended {
            index: slots.user,
            role: Role::User,
        });
        self.events.publish(Event::TurnAppended {
            index: slots.answer,
            role: Role::Assistant,
        });
        debug!(correlation_id = %correlation_id, "question submitted");
        Ok(correlation_id)
    }

    /// Snapshot of the whole history, oldest first.
    pub fn turns(&self) -> Vec<Turn> {
        self.lock().turns().to_vec()
    }

    pub fn turn(&self, index: usize) -> Option<Turn> {
        self.lock().turns().get(index).cloned()
    }

    /// Connectivity of the persistent channel; `None` for request-scoped
    /// transports.
    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.transport.connection_state()
    }

    /// Whether `ask` would currently be accepted.
    pub fn can_ask(&self) -> bool {
        let ready = matches!(
            self.connection_state(),
            None | Some(ConnectionState::Open)
        );
        let transcript = self.lock();
        ready && !transcript.is_closed() && !transcript.has_pending()
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Forget the history. Refused while an answer is in flight.
    pub fn clear(&self) -> Result<(), AssistantError> {
        self.lock().clear()?;
        self.events.publish(Event::HistoryCleared);
        Ok(())
    }

    /// Tear the conversation down: fails any in-flight answer, cancels
    /// requests, closes the channel. Idempotent.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let failed = self.lock().close(CLOSED_REASON);
        self.transport.shutdown();
        self.stop.cancel();

        for index in failed {
            self.events.publish(Event::TurnUpdated {
                index,
                status: TurnStatus::Failed,
            });
        }
        self.events.publish(Event::Shutdown);
        info!(client_id = %self.client_id, "conversation session closed");
    }

    fn lock(&self) -> MutexGuard<'_, Transcript> {
        self.transcript.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Ingest fragments in arrival order until the session closes.
async fn pump(
    mut fragments: mpsc::UnboundedReceiver<Fragment>,
    transcript: Arc<Mutex<Transcript>>,
    events: EventBus,
    stop: CancellationToken,
) {
    loop {
        let fragment = tokio::select! {
            _ = stop.cancelled() => break,
            fragment = fragments.recv() => match fragment {
                Some(fragment) => fragment,
                None => break,
            },
        };

        let update = {
            let mut transcript = transcript.lock().unwrap_or_else(PoisonError::into_inner);
            transcript
                .ingest(fragment)
                .index()
                .and_then(|index| transcript.turns().get(index).map(|t| (index, t.status())))
        };

        if let Some((index, status)) = update {
            events.publish(Event::TurnUpdated { index, status });
        }
    }
    debug!("fragment pump stopped");
}
