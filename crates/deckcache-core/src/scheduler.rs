//! Preload scheduler
//!
//! Progressively loads a user's boards into the card cache: a FIFO
//! background queue is served one small batch at a time in round-robin
//! order, and a focused board preempts the rotation with a full drain at the
//! next scheduling decision. Exactly one batch or drain fetch is ever in
//! flight.
//!
//! The scheduler is an explicit event-driven state machine: a worker task
//! owns all state and processes commands (seed, focus, defocus, reset,
//! snapshot) one at a time between jobs. Commands issued while a fetch is in
//! flight take effect at the next decision point; in-flight I/O is never
//! cancelled. Batches are capped at a small size precisely so that priority
//! takeover latency stays bounded by one round-trip.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::cache::CardCache;
use crate::error::CoreError;
use crate::event::{EventBus, SyncEvent};
use crate::listener::LiveUpdateListener;
use crate::models::{decode_documents, Board, Card};
use crate::source::{BoardDirectory, CardSource, PageCursor, SnapshotFeed};

/// Configuration for the preload scheduler
#[derive(Debug, Clone)]
pub struct PreloadConfig {
    /// Cards fetched per background batch
    pub batch_size: usize,

    /// Pause after a failed fetch before the next job runs
    pub retry_delay: Duration,

    /// Consecutive failures after which a board is parked until reset or focus
    pub max_attempts: u32,

    /// Command channel capacity
    pub command_capacity: usize,

    /// Event bus capacity
    pub event_capacity: usize,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            retry_delay: Duration::from_millis(100),
            max_attempts: 5,
            command_capacity: 64,
            event_capacity: 256,
        }
    }
}

/// Commands processed by the worker, one at a time between jobs
enum Command {
    SeedQueue { owner_id: String },
    Focus { board_id: String },
    Defocus,
    Reset,
    Snapshot(oneshot::Sender<SchedulerSnapshot>),
}

/// Point-in-time view of scheduler state, taken at a quiescent point
/// (the worker answers between jobs, never mid-fetch)
#[derive(Debug, Clone, Default)]
pub struct SchedulerSnapshot {
    pub background_queue: Vec<String>,
    pub prioritized_board: Option<String>,
    pub is_working: bool,
    pub fully_loaded: HashSet<String>,
    /// Boards with a remembered pagination cursor
    pub boards_with_cursor: HashSet<String>,
}

/// The next load operation chosen by a scheduling decision
#[derive(Debug, Clone, PartialEq, Eq)]
enum Job {
    /// Bounded page fetch for a background board
    Batch(String),
    /// Unbounded fetch of all remaining cards for the prioritized board
    Drain(String),
}

/// Scheduler state, a plain synchronous state machine
///
/// Kept free of I/O so scheduling decisions are testable without fakes.
#[derive(Default)]
struct SchedulerState {
    /// Board ids awaiting a background batch, FIFO round-robin
    background_queue: VecDeque<String>,

    /// At most one focused board, overrides the queue while set
    prioritized_board: Option<String>,

    /// True while a batch or drain fetch is outstanding
    is_working: bool,

    /// Boards with no remote cards left to fetch
    fully_loaded: HashSet<String>,

    /// Remembered pagination cursor per board
    cursors: HashMap<String, PageCursor>,

    /// Consecutive fetch failures per board
    failures: HashMap<String, u32>,

    /// Titles from the seeded board list, for logging
    titles: HashMap<String, String>,
}

impl SchedulerState {
    fn seed(&mut self, boards: &[Board]) {
        self.background_queue = boards.iter().map(|b| b.id.clone()).collect();
        self.titles = boards
            .iter()
            .map(|b| (b.id.clone(), b.title.clone()))
            .collect();
    }

    fn focus(&mut self, board_id: String) {
        // An explicit focus retries even a parked board with fresh attempts
        self.failures.remove(&board_id);
        self.prioritized_board = Some(board_id);
    }

    fn defocus(&mut self) {
        self.prioritized_board = None;
    }

    fn reset(&mut self) {
        self.background_queue.clear();
        self.prioritized_board = None;
        self.is_working = false;
        self.fully_loaded.clear();
        self.cursors.clear();
        self.failures.clear();
        self.titles.clear();
    }

    fn is_parked(&self, board_id: &str, max_attempts: u32) -> bool {
        self.failures
            .get(board_id)
            .is_some_and(|n| *n >= max_attempts)
    }

    /// The scheduling decision: pick the next job, or nothing
    ///
    /// A focused board that is fully loaded (or parked) yields no work at
    /// all; background rotation resumes only on defocus. Popped background
    /// boards that are fully loaded or parked are dropped without re-enqueue.
    fn next_job(&mut self, max_attempts: u32) -> Option<Job> {
        if self.is_working {
            return None;
        }

        if let Some(board_id) = self.prioritized_board.clone() {
            if self.fully_loaded.contains(&board_id) {
                debug!(board_id = %board_id, "Focused board already fully loaded");
                return None;
            }
            if self.is_parked(&board_id, max_attempts) {
                debug!(board_id = %board_id, "Focused board parked after repeated failures");
                return None;
            }
            return Some(Job::Drain(board_id));
        }

        while let Some(board_id) = self.background_queue.pop_front() {
            if self.fully_loaded.contains(&board_id) {
                debug!(board_id = %board_id, "Dropping fully loaded board from rotation");
                continue;
            }
            if self.is_parked(&board_id, max_attempts) {
                warn!(board_id = %board_id, "Dropping parked board from rotation");
                continue;
            }
            return Some(Job::Batch(board_id));
        }

        None
    }

    fn record_failure(&mut self, board_id: &str) -> u32 {
        let count = self.failures.entry(board_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    fn record_success(&mut self, board_id: &str) {
        self.failures.remove(board_id);
    }

    fn title<'a>(&'a self, board_id: &'a str) -> &'a str {
        self.titles
            .get(board_id)
            .map(String::as_str)
            .unwrap_or(board_id)
    }

    fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            background_queue: self.background_queue.iter().cloned().collect(),
            prioritized_board: self.prioritized_board.clone(),
            is_working: self.is_working,
            fully_loaded: self.fully_loaded.clone(),
            boards_with_cursor: self.cursors.keys().cloned().collect(),
        }
    }
}

/// Worker task owning the scheduler state and driving all load operations
struct SchedulerWorker {
    state: SchedulerState,
    config: PreloadConfig,
    boards: Arc<dyn BoardDirectory>,
    cards: Arc<dyn CardSource>,
    cache: Arc<CardCache>,
    event_bus: EventBus,
    rx: mpsc::Receiver<Command>,
}

impl SchedulerWorker {
    async fn run(mut self) {
        loop {
            // Apply every command already queued before choosing work, so a
            // focus issued during the previous job takes effect now.
            loop {
                match self.rx.try_recv() {
                    Ok(command) => self.apply(command).await,
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    Err(mpsc::error::TryRecvError::Disconnected) => return,
                }
            }

            match self.state.next_job(self.config.max_attempts) {
                Some(Job::Drain(board_id)) => self.load_remaining(board_id).await,
                Some(Job::Batch(board_id)) => self.load_batch(board_id).await,
                None => {
                    self.event_bus.publish(SyncEvent::QueueIdle);
                    match self.rx.recv().await {
                        Some(command) => self.apply(command).await,
                        None => return,
                    }
                }
            }
        }
    }

    async fn apply(&mut self, command: Command) {
        match command {
            Command::SeedQueue { owner_id } => {
                // Idempotent while the queue is non-empty: prevents duplicate
                // concurrent enumeration of boards
                if !self.state.background_queue.is_empty() {
                    debug!(owner_id = %owner_id, "Preload queue already seeded");
                    return;
                }

                match self.boards.fetch_boards(&owner_id).await {
                    Ok(boards) => {
                        info!(
                            owner_id = %owner_id,
                            boards = boards.len(),
                            titles = ?boards.iter().map(|b| b.title.as_str()).collect::<Vec<_>>(),
                            "Preload queue seeded"
                        );
                        let count = boards.len();
                        self.state.seed(&boards);
                        self.event_bus.publish(SyncEvent::QueueSeeded {
                            owner_id,
                            boards: count,
                        });
                    }
                    Err(e) => {
                        warn!(owner_id = %owner_id, error = %e, "Failed to list boards for preload");
                    }
                }
            }
            Command::Focus { board_id } => {
                debug!(board_id = %board_id, "Board focused");
                self.state.focus(board_id);
            }
            Command::Defocus => {
                debug!("Board defocused");
                self.state.defocus();
            }
            Command::Reset => {
                info!("Preload scheduler reset");
                self.state.reset();
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.state.snapshot());
            }
        }
    }

    /// Background batch load: one bounded page, cursor continuity per board
    async fn load_batch(&mut self, board_id: String) {
        let title = self.state.title(&board_id).to_string();
        debug!(board_id = %board_id, title = %title, "Loading next batch");

        self.state.is_working = true;
        let cursor = self.state.cursors.get(&board_id).cloned();

        match self
            .cards
            .fetch_cards(&board_id, Some(self.config.batch_size), cursor)
            .await
        {
            Ok(page) => {
                let fetched = page.documents.len();
                if let Some(next) = page.next_cursor {
                    self.state.cursors.insert(board_id.clone(), next);
                }

                let fresh = self.fresh_cards(&board_id, page.documents);
                let cached = fresh.len();
                debug!(
                    board_id = %board_id,
                    title = %title,
                    fetched,
                    fresh = cached,
                    "Batch loaded"
                );
                self.cache.insert_cards(fresh);
                self.state.record_success(&board_id);
                self.event_bus.publish(SyncEvent::BatchLoaded {
                    board_id: board_id.clone(),
                    fetched,
                    cached,
                });

                // A short page means the collection is exhausted
                if fetched < self.config.batch_size {
                    self.mark_fully_loaded(&board_id);
                }
            }
            Err(e) => self.handle_fetch_failure(&board_id, e).await,
        }

        // Tail re-append keeps the rotation fair; a fully loaded or parked
        // board is dropped the next time it is popped.
        self.state.background_queue.push_back(board_id);
        self.state.is_working = false;
    }

    /// Prioritized full drain: everything the cache does not yet hold
    async fn load_remaining(&mut self, board_id: String) {
        let title = self.state.title(&board_id).to_string();
        debug!(board_id = %board_id, title = %title, "Draining remaining cards");

        self.state.is_working = true;

        match self.cards.fetch_cards(&board_id, None, None).await {
            Ok(page) => {
                let fresh = self.fresh_cards(&board_id, page.documents);
                let cached = fresh.len();
                debug!(board_id = %board_id, title = %title, cached, "Drain completed");
                self.cache.insert_cards(fresh);
                self.state.record_success(&board_id);
                self.event_bus.publish(SyncEvent::BoardDrained {
                    board_id: board_id.clone(),
                    cached,
                });

                // Nothing new means everything is already cached
                if cached == 0 {
                    self.mark_fully_loaded(&board_id);
                }
            }
            Err(e) => self.handle_fetch_failure(&board_id, e).await,
        }

        self.state.is_working = false;
    }

    /// Decode a page and keep only cards not yet cached
    fn fresh_cards(&self, board_id: &str, documents: Vec<serde_json::Value>) -> Vec<Card> {
        let decoded = decode_documents(board_id, documents);
        let cached = self.cache.card_ids(board_id);
        decoded
            .into_iter()
            .filter(|card| !cached.contains(&card.id))
            .collect()
    }

    fn mark_fully_loaded(&mut self, board_id: &str) {
        if self.state.fully_loaded.insert(board_id.to_string()) {
            info!(
                board_id = %board_id,
                title = %self.state.title(board_id),
                "Board fully loaded"
            );
            self.event_bus
                .publish(SyncEvent::BoardFullyLoaded(board_id.to_string()));
        }
    }

    /// A failed fetch is absorbed: logged, counted, and retried on the
    /// board's next natural turn. The pause keeps a persistently failing
    /// board from hot-looping.
    async fn handle_fetch_failure(&mut self, board_id: &str, error: CoreError) {
        let attempts = self.state.record_failure(board_id);
        warn!(
            board_id = %board_id,
            attempts,
            error = %error,
            "Card fetch failed"
        );
        self.event_bus.publish(SyncEvent::FetchFailed {
            board_id: board_id.to_string(),
            message: error.to_string(),
        });
        tokio::time::sleep(self.config.retry_delay).await;
    }
}

/// Handle to a running preload scheduler
///
/// Owned by the session-lifetime component and passed by reference to
/// whatever needs `focus`/`defocus`. Dropping the handle shuts the worker
/// down. All operations except [`snapshot`](Self::snapshot) are fire-and-
/// forget; per the error policy, backend failures never surface here.
pub struct PreloadScheduler {
    tx: mpsc::Sender<Command>,
    listener: Arc<LiveUpdateListener>,
    cache: Arc<CardCache>,
    event_bus: EventBus,
}

impl PreloadScheduler {
    /// Create a scheduler with its own empty cache
    ///
    /// Must be called from within a Tokio runtime; the worker task is
    /// spawned immediately.
    pub fn new(
        boards: Arc<dyn BoardDirectory>,
        cards: Arc<dyn CardSource>,
        feed: Arc<dyn SnapshotFeed>,
        config: PreloadConfig,
    ) -> Self {
        Self::with_cache(boards, cards, feed, Arc::new(CardCache::new()), config)
    }

    /// Create a scheduler over an existing cache
    pub fn with_cache(
        boards: Arc<dyn BoardDirectory>,
        cards: Arc<dyn CardSource>,
        feed: Arc<dyn SnapshotFeed>,
        cache: Arc<CardCache>,
        config: PreloadConfig,
    ) -> Self {
        let event_bus = EventBus::new(config.event_capacity);
        let listener = Arc::new(LiveUpdateListener::new(
            feed,
            Arc::clone(&cache),
            event_bus.clone(),
        ));

        let (tx, rx) = mpsc::channel(config.command_capacity);
        let worker = SchedulerWorker {
            state: SchedulerState::default(),
            config,
            boards,
            cards,
            cache: Arc::clone(&cache),
            event_bus: event_bus.clone(),
            rx,
        };
        tokio::spawn(worker.run());

        Self {
            tx,
            listener,
            cache,
            event_bus,
        }
    }

    /// Seed the background queue with the user's boards and start loading
    ///
    /// A no-op while the queue is already non-empty.
    pub fn start_background_preload(&self, owner_id: &str) {
        self.send(Command::SeedQueue {
            owner_id: owner_id.to_string(),
        });
    }

    /// Give a board unconditional priority over background work
    ///
    /// Does not cancel an in-flight batch and does not clear the queue; the
    /// drain starts at the next scheduling decision.
    pub fn focus(&self, board_id: &str) {
        self.send(Command::Focus {
            board_id: board_id.to_string(),
        });
    }

    /// Clear the prioritized board and fall back to background work
    pub fn defocus(&self) {
        self.send(Command::Defocus);
    }

    /// Open a live snapshot subscription for a board
    ///
    /// Independent of the scheduler's load state; the listener and the
    /// loaders may write the same board concurrently because cache inserts
    /// are idempotent per id.
    pub fn subscribe_to_board(&self, board_id: &str) {
        self.listener.subscribe(board_id);
    }

    /// Tear down all live subscriptions
    pub fn unsubscribe_from_all_boards(&self) {
        self.listener.unsubscribe_all();
    }

    /// Unsubscribe all listeners and clear all scheduler state
    pub fn reset_queue(&self) {
        self.listener.unsubscribe_all();
        self.send(Command::Reset);
    }

    /// Reset and re-seed, e.g. after cache invalidation
    pub fn restart_preloading(&self, owner_id: &str) {
        self.reset_queue();
        self.start_background_preload(owner_id);
    }

    /// Scheduler state as of the worker's next quiescent point
    pub async fn snapshot(&self) -> Result<SchedulerSnapshot, CoreError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot(reply_tx))
            .await
            .map_err(|_| CoreError::SchedulerClosed)?;
        reply_rx.await.map_err(|_| CoreError::SchedulerClosed)
    }

    /// The cache this scheduler populates
    pub fn cache(&self) -> &Arc<CardCache> {
        &self.cache
    }

    /// The live update listener
    pub fn listener(&self) -> &LiveUpdateListener {
        &self.listener
    }

    /// Event bus for observing scheduler and listener activity
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    fn send(&self, command: Command) {
        // Absorbed by design: a closed or full channel means the worker is
        // gone or badly backlogged, and there is no caller-visible failure
        // path for scheduling operations.
        if self.tx.try_send(command).is_err() {
            warn!("Preload scheduler command dropped");
        }
    }
}
