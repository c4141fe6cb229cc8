//! Board data structures.
//!
//! A board is an arena of slots keyed by [`SlotId`] plus a separate display
//! order, so reordering never invalidates an id held by the caller.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::difficulty::Difficulty;
use crate::error::BoardError;
use crate::interval::Rating;
use crate::model::{DueRecord, GeneratorRef, Instance, Item, SlotId};

/// Lifecycle of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardState {
    Building,
    Active,
    Grading,
    Complete,
}

/// Where a slot's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotOrigin {
    Review,
    Generated,
}

/// The data behind a slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "origin", content = "data", rename_all = "lowercase")]
pub enum SlotSource {
    /// A due item, shown with its frozen text.
    Review(DueRecord),
    /// A freshly sampled item.
    Generated(Item),
}

/// One position on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSlot {
    pub id: SlotId,
    pub source: SlotSource,
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub revealed: bool,
    #[serde(default)]
    pub rating: Option<Rating>,
}

impl BoardSlot {
    pub fn origin(&self) -> SlotOrigin {
        match self.source {
            SlotSource::Review(_) => SlotOrigin::Review,
            SlotSource::Generated(_) => SlotOrigin::Generated,
        }
    }

    pub fn is_review(&self) -> bool {
        self.origin() == SlotOrigin::Review
    }

    pub fn item_id(&self) -> &str {
        match &self.source {
            SlotSource::Review(record) => &record.item_id,
            SlotSource::Generated(item) => &item.id,
        }
    }

    pub fn topic(&self) -> &str {
        match &self.source {
            SlotSource::Review(record) => &record.topic,
            SlotSource::Generated(item) => &item.topic,
        }
    }

    pub fn skill(&self) -> Option<&str> {
        match &self.source {
            SlotSource::Review(record) => record.skill.as_deref(),
            SlotSource::Generated(item) => item.skill.as_deref(),
        }
    }

    /// The slot as a bank item. Review slots become a `static` item that
    /// reproduces their frozen text.
    pub fn to_item(&self) -> Item {
        match &self.source {
            SlotSource::Generated(item) => item.clone(),
            SlotSource::Review(record) => {
                let mut params = serde_json::json!({
                    "question": record.question,
                    "answer": record.answer,
                });
                if let Some(image) = &record.image {
                    params["image"] = serde_json::Value::String(image.clone());
                }
                Item {
                    id: record.item_id.clone(),
                    domain: None,
                    topic: record.topic.clone(),
                    skill: record.skill.clone(),
                    difficulty: record.difficulty,
                    generator: GeneratorRef::new("static", params),
                }
            }
        }
    }

    /// Replace the visible content, clearing reveal and rating.
    pub(crate) fn set_content(&mut self, instance: Instance) {
        self.question = instance.question;
        self.answer = instance.answer;
        self.image = instance.image;
        self.revealed = false;
        self.rating = None;
    }
}

/// Progress through grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingStatus {
    pub rated: usize,
    pub total: usize,
}

impl GradingStatus {
    /// Every slot carries a rating.
    pub fn is_complete(&self) -> bool {
        self.rated == self.total
    }
}

/// Identity of a session whose write failed. Kept with the board so a
/// retry, even from a later process, resends under the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// The practice board for one lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub group_id: String,
    /// Requested capacity; the board may hold fewer slots.
    pub capacity: usize,
    pub state: BoardState,
    pub created_at: DateTime<Utc>,
    slots: HashMap<SlotId, BoardSlot>,
    order: Vec<SlotId>,
    next_id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_session: Option<PendingSession>,
}

impl Board {
    pub(crate) fn new(group_id: impl Into<String>, capacity: usize) -> Self {
        Self {
            group_id: group_id.into(),
            capacity,
            state: BoardState::Building,
            created_at: Utc::now(),
            slots: HashMap::new(),
            order: Vec::new(),
            next_id: 0,
            pending_session: None,
        }
    }

    /// Append a slot at the end of the display order.
    pub(crate) fn push(&mut self, source: SlotSource, instance: Instance) -> SlotId {
        let id = SlotId(self.next_id);
        self.next_id += 1;

        let difficulty = match &source {
            SlotSource::Review(record) => record.difficulty,
            SlotSource::Generated(item) => item.difficulty,
        };
        self.slots.insert(
            id,
            BoardSlot {
                id,
                source,
                question: instance.question,
                answer: instance.answer,
                image: instance.image,
                difficulty,
                revealed: false,
                rating: None,
            },
        );
        self.order.push(id);
        id
    }

    /// Slots in display order.
    pub fn slots(&self) -> impl Iterator<Item = &BoardSlot> {
        self.order.iter().filter_map(|id| self.slots.get(id))
    }

    pub fn slot(&self, id: SlotId) -> Option<&BoardSlot> {
        self.slots.get(&id)
    }

    pub(crate) fn slot_mut(&mut self, id: SlotId) -> Result<&mut BoardSlot, BoardError> {
        self.slots.get_mut(&id).ok_or(BoardError::UnknownSlot(id))
    }

    pub(crate) fn slots_mut(&mut self) -> impl Iterator<Item = &mut BoardSlot> {
        self.slots.values_mut()
    }

    /// Slot ids in display order.
    pub fn order(&self) -> &[SlotId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of slots with the given origin.
    pub fn count(&self, origin: SlotOrigin) -> usize {
        self.slots().filter(|s| s.origin() == origin).count()
    }

    pub fn grading_status(&self) -> GradingStatus {
        GradingStatus {
            rated: self.slots().filter(|s| s.rating.is_some()).count(),
            total: self.len(),
        }
    }
}
