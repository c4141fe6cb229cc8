//! Store traits for the engine's external collaborators.
//!
//! Implemented by the `dnaboard-stores` crate. Implementations should raise
//! [`crate::error::StoreError`] so callers can classify failures.

use async_trait::async_trait;

use crate::model::{DueRecord, Item, ItemFilter};
use crate::session::Session;
use crate::share::SharedBoard;

// ---------------------------------------------------------------------------
// Scheduling store
// ---------------------------------------------------------------------------

/// Review history: which items are due for a group, and where finished
/// sessions are recorded.
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    /// Human-readable store name (e.g. "file").
    fn name(&self) -> &str;

    /// Items due for review by `group_id`, most urgent first.
    async fn due_items(&self, group_id: &str) -> anyhow::Result<Vec<DueRecord>>;

    /// Persist a completed session. Must be idempotent on `session.id`.
    async fn record_session(&self, session: &Session) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Question pool store
// ---------------------------------------------------------------------------

/// The question bank.
#[async_trait]
pub trait QuestionPoolStore: Send + Sync {
    /// Human-readable store name.
    fn name(&self) -> &str;

    /// All items passing `filter`, difficulty already normalized.
    async fn query_items(&self, filter: &ItemFilter) -> anyhow::Result<Vec<Item>>;
}

// ---------------------------------------------------------------------------
// Share store
// ---------------------------------------------------------------------------

/// Published board snapshots.
#[async_trait]
pub trait ShareStore: Send + Sync {
    /// Store a snapshot and return its id.
    async fn publish(&self, board: &SharedBoard) -> anyhow::Result<String>;

    /// Fetch a snapshot by id.
    async fn load(&self, id: &str) -> anyhow::Result<SharedBoard>;

    /// All snapshots, newest first.
    async fn list(&self) -> anyhow::Result<Vec<(String, SharedBoard)>>;
}
