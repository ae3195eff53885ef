//! Card cache keyed by board
//!
//! Uses DashMap for per-board entries (batch loader, full drain, and live
//! listener all write concurrently).
//!
//! Invariant: inserts are additive and idempotent per card id. Nothing is
//! removed or mutated in place except via [`CardCache::clear`], which is what
//! makes concurrent, uncoordinated writers safe without further locking.

use std::collections::{HashMap, HashSet};

use dashmap::DashMap;
use tracing::debug;

use crate::models::Card;

/// In-memory store of cards per board
#[derive(Default)]
pub struct CardCache {
    boards: DashMap<String, HashMap<String, Card>>,
}

impl CardCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            boards: DashMap::new(),
        }
    }

    /// Current cached cards for a board; empty if none
    pub fn cards_for_board(&self, board_id: &str) -> Vec<Card> {
        self.boards
            .get(board_id)
            .map(|entry| entry.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Set of cached card ids for a board
    pub fn card_ids(&self, board_id: &str) -> HashSet<String> {
        self.boards
            .get(board_id)
            .map(|entry| entry.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Insert cards, keyed by id, grouped under each card's own board
    ///
    /// Re-inserting an existing id overwrites it; no behavior depends on
    /// whether the old or new value survives a race.
    pub fn insert_cards(&self, cards: Vec<Card>) {
        for card in cards {
            self.boards
                .entry(card.board_id.clone())
                .or_default()
                .insert(card.id.clone(), card);
        }
    }

    /// Whether a specific card is cached
    pub fn contains(&self, board_id: &str, card_id: &str) -> bool {
        self.boards
            .get(board_id)
            .map(|entry| entry.contains_key(card_id))
            .unwrap_or(false)
    }

    /// Number of cached cards for a board
    pub fn card_count(&self, board_id: &str) -> usize {
        self.boards.get(board_id).map(|e| e.len()).unwrap_or(0)
    }

    /// Number of boards with at least one cached card
    pub fn board_count(&self) -> usize {
        self.boards.len()
    }

    /// Total cached cards across all boards
    pub fn total_cards(&self) -> usize {
        self.boards.iter().map(|entry| entry.len()).sum()
    }

    /// Full reset, the only modeled deletion
    pub fn clear(&self) {
        self.boards.clear();
        debug!("Card cache cleared");
    }
}
