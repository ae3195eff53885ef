//! Live update listener
//!
//! Maintains at most one push subscription per board. Each delivery is the
//! board's full current card list; only the set difference against the cache
//! is inserted, so deliveries are cheap to apply regardless of ordering or
//! size, and the listener can interleave freely with batch and drain loads.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::CardCache;
use crate::event::{EventBus, SyncEvent};
use crate::models::{decode_documents, Card};
use crate::source::SnapshotFeed;

/// Per-board live snapshot subscriptions
pub struct LiveUpdateListener {
    feed: Arc<dyn SnapshotFeed>,
    cache: Arc<CardCache>,
    event_bus: EventBus,

    /// One consumer task per subscribed board (low contention)
    tasks: RwLock<HashMap<String, JoinHandle<()>>>,
}

impl LiveUpdateListener {
    pub fn new(feed: Arc<dyn SnapshotFeed>, cache: Arc<CardCache>, event_bus: EventBus) -> Self {
        Self {
            feed,
            cache,
            event_bus,
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe to a board's live updates; a no-op if already subscribed
    pub fn subscribe(&self, board_id: &str) {
        let mut tasks = self.tasks.write();
        if tasks.contains_key(board_id) {
            return;
        }

        let mut rx = self.feed.subscribe(board_id);
        let cache = Arc::clone(&self.cache);
        let events = self.event_bus.clone();
        let board = board_id.to_string();

        let handle = tokio::spawn(async move {
            while let Some(delivery) = rx.recv().await {
                match delivery {
                    Ok(documents) => {
                        let fetched = decode_documents(&board, documents);
                        let cached = cache.card_ids(&board);
                        let fresh: Vec<Card> = fetched
                            .into_iter()
                            .filter(|card| !cached.contains(&card.id))
                            .collect();

                        if fresh.is_empty() {
                            continue;
                        }

                        let count = fresh.len();
                        debug!(board_id = %board, count, "Live update delivered new cards");
                        cache.insert_cards(fresh);
                        events.publish(SyncEvent::CardsCached {
                            board_id: board.clone(),
                            count,
                        });
                    }
                    Err(e) => {
                        warn!(board_id = %board, error = %e, "Snapshot delivery failed");
                        events.publish(SyncEvent::ListenerError {
                            board_id: board.clone(),
                            message: e.to_string(),
                        });
                    }
                }
            }
            debug!(board_id = %board, "Snapshot feed closed");
        });

        tasks.insert(board_id.to_string(), handle);
        debug!(board_id = %board_id, "Subscribed to board");
    }

    /// Whether a board currently has a live subscription
    pub fn is_subscribed(&self, board_id: &str) -> bool {
        self.tasks.read().contains_key(board_id)
    }

    /// Number of active subscriptions
    pub fn subscription_count(&self) -> usize {
        self.tasks.read().len()
    }

    /// Tear down one board's subscription
    pub fn unsubscribe(&self, board_id: &str) {
        if let Some(handle) = self.tasks.write().remove(board_id) {
            handle.abort();
            debug!(board_id = %board_id, "Unsubscribed from board");
        }
    }

    /// Tear down all subscriptions
    pub fn unsubscribe_all(&self) {
        let mut tasks = self.tasks.write();
        for (board_id, handle) in tasks.drain() {
            handle.abort();
            debug!(board_id = %board_id, "Unsubscribed from board");
        }
    }
}

impl Drop for LiveUpdateListener {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.write().drain() {
            handle.abort();
        }
    }
}
