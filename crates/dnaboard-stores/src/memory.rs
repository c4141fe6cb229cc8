//! In-memory store for testing and demos.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use uuid::Uuid;

use dnaboard_core::error::StoreError;
use dnaboard_core::model::{DueRecord, Item, ItemFilter};
use dnaboard_core::session::Session;
use dnaboard_core::share::SharedBoard;
use dnaboard_core::traits::{QuestionPoolStore, SchedulingStore, ShareStore};

use crate::history::due_records;

/// A store that keeps everything in memory.
///
/// Implements all three store traits. Due items are computed from recorded
/// sessions unless a group's due list has been pinned with
/// [`MemoryStore::with_due_records`]. Failures can be injected per call kind.
#[derive(Default)]
pub struct MemoryStore {
    items: Vec<Item>,
    pinned_due: HashMap<String, Vec<DueRecord>>,
    sessions: Mutex<Vec<Session>>,
    shared: Mutex<Vec<(String, SharedBoard)>>,
    failures: Mutex<Failures>,
    record_calls: AtomicU32,
    query_calls: AtomicU32,
}

/// Injected failures.
#[derive(Debug, Clone, Default)]
struct Failures {
    due_items: bool,
    query_items: bool,
    /// Number of upcoming `record_session` calls that fail.
    writes: u32,
    /// HTTP-style status reported by failing writes.
    write_status: u16,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    /// Create a store over the given question pool.
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    /// Fix the due list returned for `group_id`.
    pub fn with_due_records(mut self, group_id: impl Into<String>, records: Vec<DueRecord>) -> Self {
        self.pinned_due.insert(group_id.into(), records);
        self
    }

    /// Pre-load recorded sessions.
    pub fn with_sessions(self, sessions: Vec<Session>) -> Self {
        *lock(&self.sessions) = sessions;
        self
    }

    /// Make `due_items` fail with `StoreError::Unavailable`.
    pub fn fail_due_items(&self, fail: bool) {
        lock(&self.failures).due_items = fail;
    }

    /// Make `query_items` fail with `StoreError::Unavailable`.
    pub fn fail_queries(&self, fail: bool) {
        lock(&self.failures).query_items = fail;
    }

    /// Make the next `count` session writes fail with an API error of
    /// the given status (e.g. 503 for a retryable failure, 400 for a
    /// permanent one).
    pub fn fail_next_writes(&self, count: u32, status: u16) {
        let mut failures = lock(&self.failures);
        failures.writes = count;
        failures.write_status = status;
    }

    /// Recorded sessions, oldest first.
    pub fn sessions(&self) -> Vec<Session> {
        lock(&self.sessions).clone()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Number of `record_session` calls, including failed ones.
    pub fn record_calls(&self) -> u32 {
        self.record_calls.load(Ordering::Relaxed)
    }

    /// Number of `query_items` calls, including failed ones.
    pub fn query_calls(&self) -> u32 {
        self.query_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SchedulingStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn due_items(&self, group_id: &str) -> anyhow::Result<Vec<DueRecord>> {
        if lock(&self.failures).due_items {
            return Err(StoreError::Unavailable("injected failure".into()).into());
        }
        if let Some(records) = self.pinned_due.get(group_id) {
            return Ok(records.clone());
        }
        let group: Vec<Session> = lock(&self.sessions)
            .iter()
            .filter(|s| s.group_id == group_id)
            .cloned()
            .collect();
        Ok(due_records(&group))
    }

    async fn record_session(&self, session: &Session) -> anyhow::Result<()> {
        self.record_calls.fetch_add(1, Ordering::Relaxed);
        {
            let mut failures = lock(&self.failures);
            if failures.writes > 0 {
                failures.writes -= 1;
                return Err(StoreError::Api {
                    status: failures.write_status,
                    message: "injected write failure".into(),
                }
                .into());
            }
        }

        let mut sessions = lock(&self.sessions);
        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session.clone(),
            None => sessions.push(session.clone()),
        }
        Ok(())
    }
}

#[async_trait]
impl QuestionPoolStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn query_items(&self, filter: &ItemFilter) -> anyhow::Result<Vec<Item>> {
        self.query_calls.fetch_add(1, Ordering::Relaxed);
        if lock(&self.failures).query_items {
            return Err(StoreError::Unavailable("injected failure".into()).into());
        }
        Ok(filter.apply(&self.items).into_iter().cloned().collect())
    }
}

#[async_trait]
impl ShareStore for MemoryStore {
    async fn publish(&self, board: &SharedBoard) -> anyhow::Result<String> {
        let id = Uuid::new_v4().to_string();
        lock(&self.shared).push((id.clone(), board.clone()));
        Ok(id)
    }

    async fn load(&self, id: &str) -> anyhow::Result<SharedBoard> {
        lock(&self.shared)
            .iter()
            .find(|(shared_id, _)| shared_id == id)
            .map(|(_, board)| board.clone())
            .ok_or_else(|| StoreError::NotFound(format!("shared board {id}")).into())
    }

    async fn list(&self) -> anyhow::Result<Vec<(String, SharedBoard)>> {
        let mut boards = lock(&self.shared).clone();
        boards.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
        Ok(boards)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dnaboard_core::difficulty::Difficulty;
    use dnaboard_core::model::GeneratorRef;

    fn item(id: &str, topic: &str) -> Item {
        Item {
            id: id.into(),
            domain: None,
            topic: topic.into(),
            skill: None,
            difficulty: Difficulty::Level2,
            generator: GeneratorRef::new("static", serde_json::json!({"question": "q", "answer": "a"})),
        }
    }

    fn empty_session(group: &str) -> Session {
        Session {
            id: Uuid::new_v4(),
            group_id: group.into(),
            created_at: Utc::now(),
            results: vec![],
        }
    }

    #[tokio::test]
    async fn query_applies_filter() {
        let store = MemoryStore::new(vec![item("a", "Ratio"), item("b", "Angles")]);
        let found = store.query_items(&ItemFilter::topics(["Angles"])).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "b");
        assert_eq!(store.query_calls(), 1);
    }

    #[tokio::test]
    async fn injected_read_failures() {
        let store = MemoryStore::new(vec![item("a", "Ratio")]);
        store.fail_queries(true);
        store.fail_due_items(true);
        let err = store.query_items(&ItemFilter::default()).await.unwrap_err();
        assert!(err.downcast_ref::<StoreError>().is_some());
        assert!(store.due_items("7R").await.is_err());

        store.fail_queries(false);
        assert!(store.query_items(&ItemFilter::default()).await.is_ok());
    }

    #[tokio::test]
    async fn record_is_idempotent_on_id() {
        let store = MemoryStore::default();
        let session = empty_session("7R");
        store.record_session(&session).await.unwrap();
        store.record_session(&session).await.unwrap();
        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.record_calls(), 2);
    }

    #[tokio::test]
    async fn injected_write_failures_run_out() {
        let store = MemoryStore::default();
        store.fail_next_writes(2, 503);
        let session = empty_session("7R");

        for _ in 0..2 {
            let err = store.record_session(&session).await.unwrap_err();
            let store_err = err.downcast_ref::<StoreError>().unwrap();
            assert!(store_err.is_transient());
        }
        store.record_session(&session).await.unwrap();
        assert_eq!(store.sessions().len(), 1);
    }

    #[tokio::test]
    async fn pinned_due_records_bypass_history() {
        let record = DueRecord {
            item_id: "a".into(),
            topic: "Ratio".into(),
            skill: None,
            difficulty: Difficulty::Level1,
            question: "q".into(),
            answer: "a".into(),
            image: None,
            interval: 1,
            overdue_by: 0,
        };
        let store = MemoryStore::default().with_due_records("7R", vec![record]);
        assert_eq!(store.due_items("7R").await.unwrap().len(), 1);
        assert!(store.due_items("8B").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn share_round_trip_and_listing() {
        let store = MemoryStore::default();
        let older = SharedBoard {
            name: "older".into(),
            created_at: Utc::now() - chrono::Duration::hours(1),
            questions: vec![],
        };
        let newer = SharedBoard {
            name: "newer".into(),
            created_at: Utc::now(),
            questions: vec![],
        };
        let older_id = store.publish(&older).await.unwrap();
        store.publish(&newer).await.unwrap();

        assert_eq!(store.load(&older_id).await.unwrap().name, "older");
        let listed = store.list().await.unwrap();
        assert_eq!(listed[0].1.name, "newer");

        let err = store.load("missing").await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::NotFound(_))
        ));
    }
}
