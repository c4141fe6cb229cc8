//! File-backed store.
//!
//! The question pool is read from TOML bank files. Sessions and shared
//! boards are written as pretty JSON under a data directory:
//!
//! ```text
//! <data_dir>/sessions/<group>/<session-id>.json
//! <data_dir>/shared/<board-id>.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::instrument;
use uuid::Uuid;

use dnaboard_core::error::StoreError;
use dnaboard_core::model::{DueRecord, Item, ItemFilter};
use dnaboard_core::parser::load_banks;
use dnaboard_core::session::Session;
use dnaboard_core::share::SharedBoard;
use dnaboard_core::traits::{QuestionPoolStore, SchedulingStore, ShareStore};

use crate::history::due_records;

/// Store backed by bank files and a JSON data directory.
pub struct FileStore {
    items: Vec<Item>,
    data_dir: PathBuf,
}

impl FileStore {
    /// Load the question pool from `bank` (a file or directory) and use
    /// `data_dir` for history.
    pub fn open(bank: &Path, data_dir: &Path) -> Result<Self> {
        let banks = load_banks(bank)
            .with_context(|| format!("failed to load question bank: {}", bank.display()))?;
        let items: Vec<Item> = banks.into_iter().flat_map(|b| b.items).collect();
        tracing::debug!(items = items.len(), bank = %bank.display(), "loaded question pool");
        Ok(Self::with_items(items, data_dir))
    }

    /// Use an already loaded pool.
    pub fn with_items(items: Vec<Item>, data_dir: &Path) -> Self {
        Self {
            items,
            data_dir: data_dir.to_path_buf(),
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn group_dir(&self, group_id: &str) -> PathBuf {
        self.data_dir.join("sessions").join(path_safe(group_id))
    }

    fn shared_dir(&self) -> PathBuf {
        self.data_dir.join("shared")
    }

    /// Sessions recorded for `group_id`, oldest first.
    pub fn sessions_for(&self, group_id: &str) -> Result<Vec<Session>> {
        let mut sessions = read_sessions(&self.group_dir(group_id))?;
        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }

    /// Sessions for every group, oldest first.
    pub fn all_sessions(&self) -> Result<Vec<Session>> {
        let root = self.data_dir.join("sessions");
        let mut sessions = Vec::new();
        if root.is_dir() {
            for entry in std::fs::read_dir(&root)
                .with_context(|| format!("failed to read directory: {}", root.display()))?
            {
                let path = entry?.path();
                if path.is_dir() {
                    sessions.extend(read_sessions(&path)?);
                }
            }
        }
        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }
}

/// Map a group id onto a single path component.
fn path_safe(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn read_sessions(dir: &Path) -> Result<Vec<Session>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut sessions = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            match Session::load_json(&path) {
                Ok(session) => sessions.push(session),
                Err(e) => tracing::warn!("skipping {}: {:#}", path.display(), e),
            }
        }
    }
    Ok(sessions)
}

fn unavailable(e: anyhow::Error) -> anyhow::Error {
    StoreError::Unavailable(format!("{e:#}")).into()
}

#[async_trait]
impl SchedulingStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    #[instrument(skip(self))]
    async fn due_items(&self, group_id: &str) -> anyhow::Result<Vec<DueRecord>> {
        let sessions = self.sessions_for(group_id).map_err(unavailable)?;
        Ok(due_records(&sessions))
    }

    #[instrument(skip(self, session), fields(session = %session.id))]
    async fn record_session(&self, session: &Session) -> anyhow::Result<()> {
        let path = self
            .group_dir(&session.group_id)
            .join(format!("{}.json", session.id));
        session.save_json(&path).map_err(unavailable)
    }
}

#[async_trait]
impl QuestionPoolStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn query_items(&self, filter: &ItemFilter) -> anyhow::Result<Vec<Item>> {
        Ok(filter.apply(&self.items).into_iter().cloned().collect())
    }
}

#[async_trait]
impl ShareStore for FileStore {
    async fn publish(&self, board: &SharedBoard) -> anyhow::Result<String> {
        let id = Uuid::new_v4().to_string();
        let dir = self.shared_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))
            .map_err(unavailable)?;
        let json = serde_json::to_string_pretty(board).context("failed to serialize shared board")?;
        std::fs::write(dir.join(format!("{id}.json")), json)
            .context("failed to write shared board")
            .map_err(unavailable)?;
        Ok(id)
    }

    async fn load(&self, id: &str) -> anyhow::Result<SharedBoard> {
        let path = self.shared_dir().join(format!("{}.json", path_safe(id)));
        if !path.exists() {
            return Err(StoreError::NotFound(format!("shared board {id}")).into());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .map_err(|e| StoreError::Malformed(format!("{}: {e}", path.display())).into())
    }

    async fn list(&self) -> anyhow::Result<Vec<(String, SharedBoard)>> {
        let dir = self.shared_dir();
        let mut boards = Vec::new();
        if dir.is_dir() {
            for entry in std::fs::read_dir(&dir)
                .with_context(|| format!("failed to read directory: {}", dir.display()))?
            {
                let path = entry?.path();
                let Some(id) = path
                    .file_stem()
                    .filter(|_| path.extension().is_some_and(|ext| ext == "json"))
                    .and_then(|stem| stem.to_str())
                else {
                    continue;
                };
                match self.load(id).await {
                    Ok(board) => boards.push((id.to_string(), board)),
                    Err(e) => tracing::warn!("skipping {}: {:#}", path.display(), e),
                }
            }
        }
        boards.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
        Ok(boards)
    }
}
