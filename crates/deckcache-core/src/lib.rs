//! deckcache-core - Core library for deckcache
//!
//! Provides the card cache, live update listener, and preload scheduler that
//! progressively sync a user's flashcard boards into a local cache.

pub mod cache;
pub mod error;
pub mod event;
pub mod listener;
pub mod models;
pub mod scheduler;
pub mod source;

pub use cache::CardCache;
pub use error::CoreError;
pub use event::{EventBus, SyncEvent};
pub use listener::LiveUpdateListener;
pub use models::{Board, Card};
pub use scheduler::{PreloadConfig, PreloadScheduler, SchedulerSnapshot};
pub use source::{
    BoardDirectory, CardSource, DocumentPage, PageCursor, SnapshotDelivery, SnapshotFeed,
};
