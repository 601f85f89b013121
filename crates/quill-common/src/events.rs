use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::{ConnectionState, Role, TurnStatus};

/// State changes the presentation layer can react to (incremental redraw,
/// auto-scroll, connectivity indicator).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    TurnAppended { index: usize, role: Role },
    TurnUpdated { index: usize, status: TurnStatus },
    ConnectionChanged(ConnectionState),
    HistoryCleared,
    Shutdown,
    #[serde(other)]
    Unknown,
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: Event) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(Event::ConnectionChanged(ConnectionState::Open));

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, Event::ConnectionChanged(ConnectionState::Open)));
    }

    #[tokio::test]
    async fn clones_share_subscribers() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let other = bus.clone();

        other.publish(Event::TurnAppended {
            index: 0,
            role: Role::User,
        });
        other.publish(Event::TurnUpdated {
            index: 1,
            status: TurnStatus::Streaming,
        });

        let e1 = rx.recv().await.unwrap();
        assert!(matches!(e1, Event::TurnAppended { index: 0, role: Role::User }));
        let e2 = rx.recv().await.unwrap();
        assert!(matches!(
            e2,
            Event::TurnUpdated {
                index: 1,
                status: TurnStatus::Streaming
            }
        ));
    }

    #[test]
    fn publish_returns_zero_with_no_subscribers() {
        let bus = EventBus::new(16);
        assert_eq!(bus.publish(Event::Shutdown), 0);
    }

    #[tokio::test]
    async fn publish_returns_subscriber_count() {
        let bus = EventBus::new(16);
        let _rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.publish(Event::HistoryCleared), 2);
    }

    #[test]
    fn unknown_event_deserializes() {
        let json = r#"{"type":"SomeNewEventWeNeverHeardOf","data":null}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert!(matches!(event, Event::Unknown));
    }
}
