use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

/// Event names on the relay. Payloads carry the mutated entity's id and its
/// new status; consumers treat them as a hint to re-fetch, not as state.
pub const TRIP_STATUS_UPDATED: &str = "trip-status-updated";
pub const RESERVATION_UPDATED: &str = "reservation-updated";
pub const PAYMENT_COMPLETED: &str = "payment-completed";
pub const NOTIFICATION: &str = "notification";

pub fn company_room(id: Uuid) -> String {
    format!("company-{}", id)
}

pub fn user_room(id: Uuid) -> String {
    format!("user-{}", id)
}

#[derive(Debug, Clone, Serialize)]
pub struct BusEvent {
    pub room: String,
    pub event: String,
    pub payload: serde_json::Value,
}

/// Capability interface handlers publish through. Fire and forget: no
/// delivery guarantee, no ordering across rooms, no retry. Publication
/// happens after the owning transaction commits and never rolls it back.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, room: &str, event: &str, payload: serde_json::Value);
    async fn subscribe(&self, room: &str) -> broadcast::Receiver<BusEvent>;
}

const ROOM_BUFFER: usize = 64;

pub struct InMemoryEventBus {
    rooms: RwLock<HashMap<String, broadcast::Sender<BusEvent>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, room: &str, event: &str, payload: serde_json::Value) {
        let rooms = self.rooms.read().await;

        if let Some(sender) = rooms.get(room) {
            let message = BusEvent {
                room: room.to_string(),
                event: event.to_string(),
                payload,
            };
            // Err here just means nobody is listening right now.
            match sender.send(message) {
                Ok(n) => tracing::debug!("Published {} to {} ({} receivers)", event, room, n),
                Err(_) => tracing::debug!("Dropped {} for empty room {}", event, room),
            }
        } else {
            tracing::debug!("Dropped {} for unknown room {}", event, room);
        }
    }

    async fn subscribe(&self, room: &str) -> broadcast::Receiver<BusEvent> {
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_BUFFER).0)
            .subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn delivers_to_room_subscribers() {
        let bus = InMemoryEventBus::new();
        let room = company_room(Uuid::new_v4());
        let mut rx = bus.subscribe(&room).await;

        bus.publish(&room, RESERVATION_UPDATED, json!({"id": "r1", "status": "Confirmed"}))
            .await;

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event, RESERVATION_UPDATED);
        assert_eq!(received.payload["status"], "Confirmed");
    }

    #[tokio::test]
    async fn publish_to_empty_room_is_a_noop() {
        let bus = InMemoryEventBus::new();
        // No subscriber, no panic, nothing to assert beyond completion.
        bus.publish("company-none", NOTIFICATION, json!({})).await;
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let bus = InMemoryEventBus::new();
        let room_a = user_room(Uuid::new_v4());
        let room_b = user_room(Uuid::new_v4());
        let mut rx_a = bus.subscribe(&room_a).await;
        let mut rx_b = bus.subscribe(&room_b).await;

        bus.publish(&room_a, NOTIFICATION, json!({"n": 1})).await;

        assert!(rx_a.recv().await.is_ok());
        assert!(rx_b.try_recv().is_err());
    }
}
