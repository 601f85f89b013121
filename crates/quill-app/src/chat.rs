//! Interactive terminal conversation.

use std::io::Write;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use quill_assistant::ConversationSession;
use quill_common::{Event, QuillError, Role};

use crate::printer::AnswerPrinter;

/// How long a one-shot question waits for the channel to open.
const READY_TIMEOUT: Duration = Duration::from_secs(30);

/// A line typed by the user.
#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Quit,
    Clear,
    Status,
    Question(&'a str),
    Empty,
}

pub fn parse_input(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Empty,
        "/quit" | "/exit" => Input::Quit,
        "/clear" => Input::Clear,
        "/status" => Input::Status,
        question => Input::Question(question),
    }
}

/// What the event handler wants the loop to do next.
enum Flow {
    Continue,
    AnswerFinished,
    Stop,
}

fn handle_event(session: &ConversationSession, printer: &mut AnswerPrinter, event: Event) -> Flow {
    match event {
        Event::TurnUpdated { index, status } => {
            let Some(turn) = session.turn(index) else {
                return Flow::Continue;
            };
            let Some(answer) = turn.id().filter(|_| turn.role() == Role::Assistant) else {
                return Flow::Continue;
            };
            print!("{}", printer.delta(answer, turn.text(), status, turn.error()));
            let _ = std::io::stdout().flush();
            if status.is_terminal() {
                Flow::AnswerFinished
            } else {
                Flow::Continue
            }
        }
        Event::ConnectionChanged(state) => {
            eprintln!("[{state}]");
            Flow::Continue
        }
        Event::HistoryCleared => {
            printer.reset();
            Flow::Continue
        }
        Event::Shutdown => Flow::Stop,
        Event::TurnAppended { .. } | Event::Unknown => Flow::Continue,
    }
}

fn print_status(session: &ConversationSession) {
    let connection = session
        .connection_state()
        .map(|state| state.to_string())
        .unwrap_or_else(|| "n/a".into());
    eprintln!(
        "transport: {}  connection: {}  turns: {}  ready: {}",
        session.transport_kind(),
        connection,
        session.turns().len(),
        session.can_ask()
    );
}

async fn wait_until_ready(
    session: &ConversationSession,
    events: &mut broadcast::Receiver<Event>,
) -> Result<(), QuillError> {
    let ready = async {
        while !session.can_ask() {
            if let Err(broadcast::error::RecvError::Closed) = events.recv().await {
                return;
            }
        }
    };
    tokio::time::timeout(READY_TIMEOUT, ready)
        .await
        .map_err(|_| QuillError::Network("assistant channel did not open in time".into()))
}

/// Ask a single question and print its answer.
pub async fn ask_once(session: &ConversationSession, question: &str) -> Result<(), QuillError> {
    let mut events = session.subscribe();
    wait_until_ready(session, &mut events).await?;

    session
        .ask(question)
        .map_err(|e| QuillError::Assistant(e.to_string()))?;

    let mut printer = AnswerPrinter::default();
    loop {
        match events.recv().await {
            Ok(event) => match handle_event(session, &mut printer, event) {
                Flow::Continue => {}
                Flow::AnswerFinished | Flow::Stop => return Ok(()),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "event receiver lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return Ok(()),
        }
    }
}

/// Read questions from stdin until EOF or `/quit`.
pub async fn run(session: &ConversationSession) -> Result<(), QuillError> {
    let mut events = session.subscribe();
    let mut printer = AnswerPrinter::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprintln!("Ask a question, or /status, /clear, /quit.");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };
                match parse_input(&line) {
                    Input::Quit => break,
                    Input::Empty => {}
                    Input::Status => print_status(session),
                    Input::Clear => match session.clear() {
                        Ok(()) => eprintln!("[history cleared]"),
                        Err(e) => eprintln!("[{e}]"),
                    },
                    Input::Question(question) => {
                        if let Err(e) = session.ask(question) {
                            eprintln!("[{e}]");
                        }
                    }
                }
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if let Flow::Stop = handle_event(session, &mut printer, event) {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}
