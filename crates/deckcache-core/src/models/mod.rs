//! Data models for deckcache

pub mod board;
pub mod card;

pub use board::Board;
pub use card::{
    decode_documents, Card, CardStatus, ContentType, ReviewStats, SpacedRepetition, Visibility,
};
