//! Long-lived WebSocket channel shared by all exchanges of a session.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, warn};

use quill_common::{ConnectionState, CorrelationId, EventBus};
use quill_config::{ConnectionConfig, TransportKind};

use crate::lifecycle::{ConnectionManager, Connector};
use crate::protocol::{decode_frame, ChannelRequest};
use crate::turn::{Exchange, Fragment};
use crate::AssistantError;

use super::{FragmentSink, Transport};

pub struct PersistentChannelTransport {
    manager: ConnectionManager,
    /// Exchange currently awaiting frames on the channel.
    in_flight: Arc<Mutex<Option<CorrelationId>>>,
}

impl PersistentChannelTransport {
    /// Create the transport and start connecting to `url`.
    pub fn connect(
        url: String,
        config: &ConnectionConfig,
        connector: Arc<dyn Connector>,
        sink: FragmentSink,
        events: EventBus,
    ) -> Result<Self, AssistantError> {
        let in_flight = Arc::new(Mutex::new(None));
        let route = Arc::clone(&in_flight);

        let manager = ConnectionManager::new(url, config, connector, events, move |text: String| {
            route_frame(&text, &route, &sink);
        });
        manager.open()?;

        Ok(Self { manager, in_flight })
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }
}

/// Decode one inbound message and forward its payloads. Frames without a
/// `correlation_id` belong to the exchange in flight.
fn route_frame(text: &str, in_flight: &Mutex<Option<CorrelationId>>, sink: &FragmentSink) {
    let frame = match decode_frame(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(error = %e, "skipping malformed channel frame");
            return;
        }
    };

    let mut current = in_flight.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(correlation_id) = frame.correlation_id.clone().or_else(|| current.clone()) else {
        warn!("dropping channel frame with no exchange in flight");
        return;
    };

    let terminal = frame.is_terminal();
    for payload in frame.payloads {
        sink.emit(Fragment {
            correlation_id: correlation_id.clone(),
            payload,
        });
    }

    if terminal && current.as_ref() == Some(&correlation_id) {
        debug!(correlation_id = %correlation_id, "channel exchange finished");
        *current = None;
    }
}

impl Transport for PersistentChannelTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::PersistentChannel
    }

    fn send(&self, exchange: Exchange) -> Result<(), AssistantError> {
        if self.manager.state() != ConnectionState::Open {
            if let Err(e) = self.manager.reconnect_now() {
                warn!(error = %e, "failed to request reconnect");
            }
            return Err(AssistantError::ChannelUnavailable);
        }

        let frame = serde_json::to_string(&ChannelRequest::from(&exchange))
            .map_err(|e| AssistantError::MalformedFrame(e.to_string()))?;

        let mut current = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        *current = Some(exchange.correlation_id.clone());
        if let Err(e) = self.manager.send(frame) {
            *current = None;
            return Err(e);
        }
        debug!(correlation_id = %exchange.correlation_id, "question sent on channel");
        Ok(())
    }

    fn connection_state(&self) -> Option<ConnectionState> {
        Some(self.manager.state())
    }

    fn shutdown(&self) {
        self.manager.close();
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
