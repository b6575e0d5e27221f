//! Typed publish/subscribe bus for VFS events.
//!
//! Decouples the manager from consumers: emitters never call into
//! listeners directly, and emission is fire-and-forget.

use tokio::sync::broadcast;

use cumulo_types::VfsEvent;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Broadcast bus carrying [`VfsEvent`]s.
///
/// Subscribers that fall behind lose the oldest events (broadcast
/// semantics); the side channel is observability, not a durable log.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<VfsEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn emit(&self, event: VfsEvent) {
        tracing::trace!(?event, "vfs event");
        let _ = self.tx.send(event);
    }

    /// Subscribe to the bus. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<VfsEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
