//! Process-wide broadcast bus for member-created events.
//!
//! # Guarantees
//!
//! - **At-most-once delivery**: slow receivers may miss events
//! - **In-memory only**: events are not persisted
//! - **No replay**: lagged receivers get `RecvError::Lagged`
//!
//! Missing an event only delays a threshold check until the next event of
//! the same source, because every check re-counts the whole window.

use tokio::sync::broadcast;

use crate::types::MemberCreatedEvent;

/// Default channel capacity for the event bus.
const DEFAULT_CAPACITY: usize = 10_000;

/// Broadcast bus carrying [`MemberCreatedEvent`]s.
///
/// Subscription is by event type only; filtering by source happens in the
/// subscriber.
#[derive(Clone)]
pub struct MemberEventBus {
    sender: broadcast::Sender<MemberCreatedEvent>,
}

impl MemberEventBus {
    /// Create a new bus with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new bus with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    pub fn publish(&self, event: MemberCreatedEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<MemberCreatedEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for MemberEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemberEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemberEventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
