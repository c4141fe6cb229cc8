//! Shareable board snapshots.
//!
//! A snapshot freezes the current text of every slot so another teacher
//! (or the same one, next lesson) can put the exact board back up.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::model::Item;

/// A published board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedBoard {
    /// Display name, usually the class name.
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<SharedQuestion>,
}

/// One slot of a shared board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharedQuestion {
    /// The item behind the slot, so a loaded board can regenerate it.
    pub item: Item,
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl SharedBoard {
    /// Snapshot `board` in display order.
    ///
    /// Review slots are shared as plain items built from their due record,
    /// keeping the frozen text and a `static` generator.
    pub fn from_board(board: &Board, name: impl Into<String>) -> Self {
        let questions = board
            .slots()
            .map(|slot| SharedQuestion {
                item: slot.to_item(),
                question: slot.question.clone(),
                answer: slot.answer.clone(),
                image: slot.image.clone(),
            })
            .collect();

        Self {
            name: name.into(),
            created_at: Utc::now(),
            questions,
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Distinct topics, in first-appearance order.
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = Vec::new();
        for q in &self.questions {
            if !topics.contains(&q.item.topic.as_str()) {
                topics.push(&q.item.topic);
            }
        }
        topics
    }

    /// Case-insensitive match on the board name or any topic. An empty
    /// query matches everything.
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&query)
            || self
                .questions
                .iter()
                .any(|q| q.item.topic.to_lowercase().contains(&query))
    }
}
