//! Completed practice sessions.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::{Board, SlotOrigin};
use crate::difficulty::Difficulty;
use crate::interval::{interval_for, Rating};
use crate::model::SlotId;

/// The record of one completed board, written to the scheduling store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session id. Retries resend the same id.
    pub id: Uuid,
    pub group_id: String,
    pub created_at: DateTime<Utc>,
    /// One entry per slot, in board display order.
    pub results: Vec<SessionResult>,
}

/// The outcome of a single slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub slot_id: SlotId,
    pub item_id: String,
    pub topic: String,
    #[serde(default)]
    pub skill: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub origin: SlotOrigin,
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// `None` when the slot was never rated.
    pub rating: Option<Rating>,
    /// Lessons until the item is due again.
    pub interval: u32,
}

impl Session {
    /// Snapshot a board's slots into a new session.
    pub fn from_board(board: &Board) -> Self {
        let results = board
            .slots()
            .map(|slot| SessionResult {
                slot_id: slot.id,
                item_id: slot.item_id().to_string(),
                topic: slot.topic().to_string(),
                skill: slot.skill().map(str::to_string),
                difficulty: slot.difficulty,
                origin: slot.origin(),
                question: slot.question.clone(),
                answer: slot.answer.clone(),
                image: slot.image.clone(),
                rating: slot.rating,
                interval: interval_for(slot.rating),
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            group_id: board.group_id.clone(),
            created_at: Utc::now(),
            results,
        }
    }

    /// Intervals in display order.
    pub fn intervals(&self) -> Vec<u32> {
        self.results.iter().map(|r| r.interval).collect()
    }

    /// Save the session as pretty JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize session")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write session to {}", path.display()))?;
        Ok(())
    }

    /// Load a session from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read session from {}", path.display()))?;
        let session: Session =
            serde_json::from_str(&content).context("failed to parse session JSON")?;
        Ok(session)
    }
}
