//! Service seams to the remote backend
//!
//! The scheduler and listener only ever talk to the backend through these
//! traits. Pages carry raw documents so the per-document decode policy lives
//! with the models, not with each backend implementation.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::CoreError;
use crate::models::Board;

/// Opaque pagination token marking where the next batch should continue
///
/// Only a source implementation can interpret the token; callers just hand
/// it back on the next fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor(String);

impl PageCursor {
    /// Wrap a backend-specific continuation token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Backend-specific continuation token
    pub fn token(&self) -> &str {
        &self.0
    }
}

/// One page of raw card documents
#[derive(Debug, Default)]
pub struct DocumentPage {
    pub documents: Vec<Value>,

    /// Token for the next page; absent when the source cannot continue
    pub next_cursor: Option<PageCursor>,
}

/// One-shot listing of a user's boards, used once at preload start
#[async_trait]
pub trait BoardDirectory: Send + Sync {
    async fn fetch_boards(&self, owner_id: &str) -> Result<Vec<Board>, CoreError>;
}

/// Paginated and full reads of a board's remote card collection
#[async_trait]
pub trait CardSource: Send + Sync {
    /// Fetch cards for a board
    ///
    /// With `limit` set, returns at most `limit` documents and a cursor to
    /// continue from; a page shorter than `limit` means end-of-collection.
    /// With `limit` absent, returns the entire remaining collection (from
    /// `start_after` if given) and no cursor.
    async fn fetch_cards(
        &self,
        board_id: &str,
        limit: Option<usize>,
        start_after: Option<PageCursor>,
    ) -> Result<DocumentPage, CoreError>;
}

/// A single delivery from a live snapshot subscription: the board's full
/// current document set, or a backend error
pub type SnapshotDelivery = Result<Vec<Value>, CoreError>;

/// Push subscription that delivers a board's full current card list on every
/// backend change
pub trait SnapshotFeed: Send + Sync {
    /// Open a subscription for a board
    ///
    /// The feed stops delivering when the returned receiver is dropped.
    fn subscribe(&self, board_id: &str) -> mpsc::Receiver<SnapshotDelivery>;
}
