//! Public handle for the persistent channel connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use quill_common::{ConnectionState, Event, EventBus};
use quill_config::ConnectionConfig;

use super::connection::connection_loop;
use super::connector::Connector;
use crate::AssistantError;

/// Callback invoked with every inbound text frame.
pub(super) type FrameHandler = Arc<dyn Fn(String) + Send + Sync>;

/// State shared between the handle and the connection task.
pub(super) struct Shared {
    pub(super) url: String,
    pub(super) connect_timeout: Duration,
    pub(super) reconnect_delay: Duration,
    pub(super) max_reconnect_delay: Duration,
    pub(super) connector: Arc<dyn Connector>,
    pub(super) on_frame: FrameHandler,
    pub(super) events: EventBus,
    pub(super) state: watch::Sender<ConnectionState>,
    pub(super) closed: AtomicBool,
    pub(super) cancel: CancellationToken,
    /// Cuts a pending backoff short.
    pub(super) wake: Notify,
    pub(super) outbound: mpsc::UnboundedSender<String>,
}

impl Shared {
    /// Move to `next`, publishing the change. Once closed, only
    /// `Disconnected` is accepted.
    pub(super) fn transition(&self, next: ConnectionState) -> bool {
        self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            if self.closed.load(Ordering::SeqCst) && next != ConnectionState::Disconnected {
                return false;
            }
            info!(from = %state, to = %next, "assistant channel state");
            *state = next;
            self.events.publish(Event::ConnectionChanged(next));
            true
        })
    }
}

/// Owns the long-lived connection of one persistent-channel transport.
///
/// Dropping the manager closes the connection.
pub struct ConnectionManager {
    pub(super) shared: Arc<Shared>,
    outbound_rx: Mutex<Option<mpsc::UnboundedReceiver<String>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    pub fn new(
        url: impl Into<String>,
        config: &ConnectionConfig,
        connector: Arc<dyn Connector>,
        events: EventBus,
        on_frame: impl Fn(String) + Send + Sync + 'static,
    ) -> Self {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Disconnected);

        let shared = Arc::new(Shared {
            url: url.into(),
            connect_timeout: Duration::from_secs(u64::from(config.connect_timeout_secs)),
            reconnect_delay: Duration::from_millis(u64::from(config.reconnect_delay_ms)),
            max_reconnect_delay: Duration::from_millis(u64::from(
                config.max_reconnect_delay_ms.max(config.reconnect_delay_ms),
            )),
            connector,
            on_frame: Arc::new(on_frame),
            events,
            state,
            closed: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            wake: Notify::new(),
            outbound,
        });

        Self {
            shared,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            task: Mutex::new(None),
        }
    }

    /// Start connecting. A no-op while a connection task is already running
    /// and after `close()`.
    pub fn open(&self) -> Result<(), AssistantError> {
        if self.is_closed() {
            debug!("open ignored: channel was closed");
            return Ok(());
        }

        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            debug!("open ignored: channel task already running");
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| AssistantError::TransportFailure("no async runtime available".into()))?;
        let Some(outbound_rx) = self
            .outbound_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return Ok(());
        };

        self.shared.transition(ConnectionState::Connecting);
        *task = Some(runtime.spawn(connection_loop(Arc::clone(&self.shared), outbound_rx)));
        Ok(())
    }

    /// Ask for a connection as soon as possible: opens a never-opened
    /// channel, or skips the remaining backoff while `Reconnecting`.
    pub fn reconnect_now(&self) -> Result<(), AssistantError> {
        if self.is_closed() {
            return Ok(());
        }
        match self.state() {
            ConnectionState::Disconnected => self.open(),
            ConnectionState::Reconnecting => {
                debug!("reconnect requested");
                self.shared.wake.notify_one();
                Ok(())
            }
            ConnectionState::Connecting | ConnectionState::Open => Ok(()),
        }
    }

    /// Queue a text frame. Only accepted while `Open`.
    pub fn send(&self, frame: String) -> Result<(), AssistantError> {
        if self.state() != ConnectionState::Open {
            return Err(AssistantError::ChannelUnavailable);
        }
        self.shared
            .outbound
            .send(frame)
            .map_err(|_| AssistantError::ChannelUnavailable)
    }

    /// Close for good: cancels the connection task and any backoff timer.
    /// Idempotent.
    pub fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.cancel.cancel();
        self.shared.transition(ConnectionState::Disconnected);
        info!("assistant channel closed");
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Receiver that always holds the current state.
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}
