//! Error types for deckcache-core
//!
//! Fetch and decode failures are absorbed at the scheduler boundary; these
//! types exist for the service seams and for per-document decode reporting.

use thiserror::Error;

/// Core error type for deckcache operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // Backend Errors
    // ===================
    #[error("Failed to list boards for owner {owner_id}: {message}")]
    BoardListing { owner_id: String, message: String },

    #[error("Failed to fetch cards for board {board_id}: {message}")]
    CardFetch { board_id: String, message: String },

    #[error("Snapshot subscription failed for board {board_id}: {message}")]
    Subscription { board_id: String, message: String },

    // ===================
    // Decode Errors
    // ===================
    #[error("Failed to decode card document for board {board_id}")]
    CardDecode {
        board_id: String,
        #[source]
        source: serde_json::Error,
    },

    // ===================
    // Scheduler Errors
    // ===================
    #[error("Preload scheduler is shut down")]
    SchedulerClosed,
}

impl CoreError {
    /// Build a card fetch error from any backend failure message
    pub fn card_fetch(board_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CardFetch {
            board_id: board_id.into(),
            message: message.into(),
        }
    }

    /// Build a board listing error
    pub fn board_listing(owner_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BoardListing {
            owner_id: owner_id.into(),
            message: message.into(),
        }
    }

    /// Build a subscription error
    pub fn subscription(board_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Subscription {
            board_id: board_id.into(),
            message: message.into(),
        }
    }
}
