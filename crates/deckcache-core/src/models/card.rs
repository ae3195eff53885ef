//! Card model mirroring the backend document shape
//!
//! Cards are treated as values for caching purposes: an update is a new
//! insert keyed by id, never an in-place mutation. Spaced-repetition fields
//! are carried as data only; no scheduling algorithm lives in this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::CoreError;

/// Publication status of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardStatus {
    Draft,
    Published,
    Archived,
    Flagged,
}

impl Default for CardStatus {
    fn default() -> Self {
        Self::Published
    }
}

/// Content type of the card faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Text,
    Image,
    Audio,
}

impl Default for ContentType {
    fn default() -> Self {
        Self::Text
    }
}

/// Who can see the card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Unlisted,
    Public,
}

impl Default for Visibility {
    fn default() -> Self {
        Self::Private
    }
}

/// Study results accumulated for a card
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewStats {
    pub correct: u32,
    pub wrong: u32,
    #[serde(default)]
    pub last_reviewed_at: Option<DateTime<Utc>>,
}

/// Spaced-repetition state (data only, no scheduler)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpacedRepetition {
    pub ease: f64,
    pub interval_days: u32,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    pub reps: u32,
    pub lapses: u32,
}

impl Default for SpacedRepetition {
    fn default() -> Self {
        Self {
            ease: 2.5,
            interval_days: 0,
            due_at: None,
            reps: 0,
            lapses: 0,
        }
    }
}

/// A flashcard belonging to exactly one board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Document id
    pub id: String,

    /// Owning board id
    pub board_id: String,

    /// Owner's user id
    pub owner_id: String,

    /// Front-side prompt
    pub term: String,

    /// Back-side answer
    pub answer: String,

    #[serde(rename = "type", default)]
    pub content_type: ContentType,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub status: CardStatus,

    #[serde(default)]
    pub visibility: Visibility,

    #[serde(default)]
    pub review_stats: ReviewStats,

    #[serde(default)]
    pub spaced_repetition: SpacedRepetition,

    #[serde(default)]
    pub views: u64,

    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub is_deleted: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_version() -> u32 {
    1
}

impl Card {
    /// Decode a single raw backend document into a card
    pub fn from_document(board_id: &str, document: Value) -> Result<Self, CoreError> {
        serde_json::from_value(document).map_err(|source| CoreError::CardDecode {
            board_id: board_id.to_string(),
            source,
        })
    }
}

/// Decode a page of raw documents, skipping malformed entries
///
/// A malformed document is logged and dropped; the rest of the page is still
/// processed. A single bad document never aborts a batch.
pub fn decode_documents(board_id: &str, documents: Vec<Value>) -> Vec<Card> {
    let mut cards = Vec::with_capacity(documents.len());

    for document in documents {
        match Card::from_document(board_id, document) {
            Ok(card) => cards.push(card),
            Err(e) => {
                warn!(board_id = %board_id, error = %e, "Skipping malformed card document");
            }
        }
    }

    cards
}
