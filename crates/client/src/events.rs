//! Cross-component event bus.
//!
//! The HTTP layer does not reach into store internals. When it observes a
//! 401 it emits [`AuthEvent::Unauthorized`] here; the session store and the
//! router react through the subscription installed by
//! [`crate::state::AppState::spawn_unauthorized_listener`].

use tokio::sync::broadcast;

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Authentication events observed by the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// A response came back 401: the token is expired or invalid.
    Unauthorized,
}

/// Broadcast bus for [`AuthEvent`]s.
///
/// Cheaply cloneable; every clone shares the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AuthEvent>,
}

impl EventBus {
    /// Create a new event bus.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Subscribe to events emitted after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all current subscribers.
    ///
    /// Emitting with no subscribers is not an error; the event is dropped.
    pub fn emit(&self, event: AuthEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_delivery() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.emit(AuthEvent::Unauthorized);
        let event = rx.recv().await.expect("event lost");
        assert_eq!(event, AuthEvent::Unauthorized);
    }

    #[test]
    fn test_emit_without_subscribers_is_noop() {
        let bus = EventBus::new();
        bus.emit(AuthEvent::Unauthorized);
    }
}
