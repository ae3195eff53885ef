//! Board model
//!
//! A board is a named collection of flashcards owned by a user and is the
//! unit of scheduling for the preload pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named collection of flashcards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Document id
    pub id: String,

    /// Display title
    pub title: String,

    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Owner's user id
    pub owner_id: String,

    /// Server-side creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last add/study/delete action on the board, if any
    #[serde(default)]
    pub last_activity_at: Option<DateTime<Utc>>,
}
