//! Event bus for deckcache using tokio::broadcast
//!
//! Provides a publish-subscribe mechanism for cache and scheduler updates.

use tokio::sync::broadcast;

/// Events emitted by the preload pipeline
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Background queue was seeded with a user's boards
    QueueSeeded { owner_id: String, boards: usize },
    /// A background batch finished for a board
    BatchLoaded {
        board_id: String,
        fetched: usize,
        cached: usize,
    },
    /// A prioritized full drain finished for a board
    BoardDrained { board_id: String, cached: usize },
    /// The live listener inserted new cards for a board
    CardsCached { board_id: String, count: usize },
    /// No further remote cards remain for a board
    BoardFullyLoaded(String),
    /// A batch or drain fetch failed
    FetchFailed { board_id: String, message: String },
    /// A snapshot delivery failed
    ListenerError { board_id: String, message: String },
    /// The scheduler has no runnable work and is waiting for input
    QueueIdle,
}

/// Event bus for broadcasting sync events
///
/// Uses tokio::broadcast for multi-consumer support. Publishing with no
/// subscribers is a no-op.
pub struct EventBus {
    sender: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create with default capacity (256 events)
    pub fn default_capacity() -> Self {
        Self::new(256)
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: SyncEvent) {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to receive events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sender.subscribe()
    }

    /// Get current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::default_capacity()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}
