use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;

use quill_common::{ConnectionState, CorrelationId, Event, EventBus, Role, TurnStatus};
use quill_config::{AssistantConfig, TransportKind};

use super::*;
use crate::transport::{FragmentSink, Transport};
use crate::turn::{Exchange, Fragment};
use crate::AssistantError;

/// Records exchanges; tests push the answer fragments by hand.
struct ManualTransport {
    sink: FragmentSink,
    sent: Mutex<Vec<Exchange>>,
    reject: AtomicBool,
    shut_down: AtomicBool,
}

impl ManualTransport {
    fn new(sink: FragmentSink) -> Self {
        Self {
            sink,
            sent: Mutex::new(Vec::new()),
            reject: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
        }
    }

    fn emit(&self, fragment: Fragment) {
        assert!(self.sink.emit(fragment));
    }

    fn last_exchange(&self) -> Exchange {
        self.sent.lock().unwrap().last().cloned().unwrap()
    }
}

impl Transport for ManualTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::ChunkedStream
    }

    fn send(&self, exchange: Exchange) -> Result<(), AssistantError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(AssistantError::ChannelUnavailable);
        }
        self.sent.lock().unwrap().push(exchange);
        Ok(())
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
    }
}

fn session() -> (ConversationSession, Arc<ManualTransport>) {
    let mut manual = None;
    let session = ConversationSession::with_transport(
        &AssistantConfig::default(),
        EventBus::new(64),
        |sink, _client_id| {
            let transport = Arc::new(ManualTransport::new(sink));
            manual = Some(Arc::clone(&transport));
            Ok(transport as Arc<dyn Transport>)
        },
    )
    .unwrap();
    (session, manual.unwrap())
}

async fn wait_for_status(rx: &mut broadcast::Receiver<Event>, index: usize, status: TurnStatus) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Event::TurnUpdated { index: i, status: s } = rx.recv().await.unwrap() {
                if i == index && s == status {
                    return;
                }
            }
        }
    })
    .await
    .expect("turn never reached the expected status");
}

#[tokio::test]
async fn streamed_answer_is_assembled_in_order() {
    let (session, transport) = session();
    let mut rx = session.subscribe();

    let id = session.ask("  What is X?  ").unwrap();
    let exchange = transport.last_exchange();
    assert_eq!(exchange.correlation_id, id);
    assert_eq!(exchange.question, "What is X?");
    assert!(exchange.history.is_empty());

    let answer = session.turn(1).unwrap();
    assert_eq!(answer.status(), TurnStatus::Pending);
    assert_eq!(answer.id(), Some(&id));

    transport.emit(Fragment::text(id.clone(), "X is "));
    wait_for_status(&mut rx, 1, TurnStatus::Streaming).await;
    transport.emit(Fragment::text(id.clone(), "a thing."));
    transport.emit(Fragment::end(id.clone()));
    wait_for_status(&mut rx, 1, TurnStatus::Complete).await;

    let turns = session.turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role(), Role::User);
    assert_eq!(turns[0].text(), "What is X?");
    assert_eq!(turns[0].status(), TurnStatus::Complete);
    assert_eq!(turns[1].role(), Role::Assistant);
    assert_eq!(turns[1].text(), "X is a thing.");
    assert_eq!(turns[1].status(), TurnStatus::Complete);
    assert!(session.can_ask());
}

#[tokio::test]
async fn ask_publishes_appended_turns() {
    let (session, _transport) = session();
    let mut rx = session.subscribe();

    session.ask("hello").unwrap();

    assert!(matches!(
        rx.recv().await.unwrap(),
        Event::TurnAppended { index: 0, role: Role::User }
    ));
    assert!(matches!(
        rx.recv().await.unwrap(),
        Event::TurnAppended { index: 1, role: Role::Assistant }
    ));
}

#[tokio::test]
async fn ask_while_answer_in_flight_is_rejected() {
    let (session, transport) = session();
    let mut rx = session.subscribe();

    let id = session.ask("first").unwrap();
    assert!(!session.can_ask());
    assert!(matches!(
        session.ask("second"),
        Err(AssistantError::InvalidState(_))
    ));

    transport.emit(Fragment::text(id.clone(), "partial"));
    wait_for_status(&mut rx, 1, TurnStatus::Streaming).await;
    assert!(matches!(
        session.ask("second"),
        Err(AssistantError::InvalidState(_))
    ));
    assert_eq!(session.turns().len(), 2);
    assert_eq!(transport.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn empty_question_is_rejected() {
    let (session, transport) = session();

    assert!(matches!(session.ask("   "), Err(AssistantError::InvalidState(_))));
    assert!(session.turns().is_empty());
    assert!(transport.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rejected_send_rolls_back_both_turns() {
    let (session, transport) = session();
    transport.reject.store(true, Ordering::SeqCst);

    assert_eq!(session.ask("hello"), Err(AssistantError::ChannelUnavailable));
    assert!(session.turns().is_empty());
    assert!(session.can_ask());

    transport.reject.store(false, Ordering::SeqCst);
    session.ask("hello").unwrap();
    assert_eq!(session.turns().len(), 2);
}

#[tokio::test]
async fn error_fragment_fails_turn_and_keeps_session_usable() {
    let (session, transport) = session();
    let mut rx = session.subscribe();

    let id = session.ask("first").unwrap();
    transport.emit(Fragment::text(id.clone(), "Half an"));
    transport.emit(Fragment::error(id.clone(), "model overloaded"));
    wait_for_status(&mut rx, 1, TurnStatus::Failed).await;

    let failed = session.turn(1).unwrap();
    assert_eq!(failed.text(), "Half an");
    assert_eq!(
        failed.error(),
        Some(AssistantConfig::default().failure_message.as_str())
    );

    transport.emit(Fragment::text(id.clone(), " answer"));
    let second = session.ask("second").unwrap();
    assert_ne!(second, id);
    assert_eq!(transport.last_exchange().history.len(), 1);
    assert_eq!(session.turn(1).unwrap().text(), "Half an");
}

#[tokio::test]
async fn fragment_for_unknown_exchange_changes_nothing() {
    let (session, transport) = session();
    let mut rx = session.subscribe();

    let id = session.ask("question").unwrap();
    transport.emit(Fragment::text(CorrelationId::new(), "intruder"));
    transport.emit(Fragment::end(id));
    wait_for_status(&mut rx, 1, TurnStatus::Complete).await;

    let turns = session.turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].text(), "");
}

#[tokio::test]
async fn completed_turns_become_context() {
    let (session, transport) = session();
    let mut rx = session.subscribe();

    let id = session.ask("What is X?").unwrap();
    transport.emit(Fragment::text(id.clone(), "X is a thing."));
    transport.emit(Fragment::end(id));
    wait_for_status(&mut rx, 1, TurnStatus::Complete).await;

    session.ask("And Y?").unwrap();
    let history = transport.last_exchange().history;
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].text, "What is X?");
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].text, "X is a thing.");
}

#[tokio::test]
async fn close_fails_in_flight_answer() {
    let (session, transport) = session();
    let mut rx = session.subscribe();

    let id = session.ask("question").unwrap();
    session.close();
    session.close();

    assert!(transport.shut_down.load(Ordering::SeqCst));
    let answer = session.turn(1).unwrap();
    assert_eq!(answer.status(), TurnStatus::Failed);
    assert_eq!(answer.error(), Some("conversation closed"));
    assert!(!session.can_ask());
    assert!(matches!(session.ask("again"), Err(AssistantError::InvalidState(_))));

    let _ = transport.sink.emit(Fragment::text(id, "late"));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(session.turn(1).unwrap().text(), "");

    let mut saw_shutdown = false;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, Event::Shutdown) {
            saw_shutdown = true;
        }
    }
    assert!(saw_shutdown);
}

#[tokio::test]
async fn dropping_the_session_shuts_the_transport_down() {
    let (session, transport) = session();
    drop(session);
    assert!(transport.shut_down.load(Ordering::SeqCst));
}

#[tokio::test]
async fn clear_is_refused_while_answer_in_flight() {
    let (session, transport) = session();
    let mut rx = session.subscribe();

    let id = session.ask("question").unwrap();
    assert!(session.clear().is_err());

    transport.emit(Fragment::end(id));
    wait_for_status(&mut rx, 1, TurnStatus::Complete).await;
    session.clear().unwrap();
    assert!(session.turns().is_empty());
}

#[tokio::test]
async fn request_scoped_transport_reports_no_connection_state() {
    let (session, _transport) = session();
    assert_eq!(session.connection_state(), None::<ConnectionState>);
    assert_eq!(session.transport_kind(), TransportKind::ChunkedStream);
    assert!(!session.client_id().as_str().is_empty());
}
