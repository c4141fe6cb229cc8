//! Core data model types for dnaboard.
//!
//! Items come from the question bank, due records from the scheduling
//! store. Both are read-only inputs to the board engine.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::difficulty::Difficulty;

/// A question template from the bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier.
    pub id: String,
    /// Broad area (e.g. "Number", "Algebra").
    #[serde(default)]
    pub domain: Option<String>,
    /// Topic the item belongs to.
    pub topic: String,
    /// Finer-grained skill within the topic.
    #[serde(default)]
    pub skill: Option<String>,
    /// Canonical difficulty. Any stored encoding is accepted on read.
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Which generator produces instances of this item.
    pub generator: GeneratorRef,
}

/// Reference to a registered generator strategy plus its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorRef {
    /// Registered strategy name (e.g. "template").
    pub strategy: String,
    /// Strategy-specific parameters.
    #[serde(default = "empty_params")]
    pub params: serde_json::Value,
}

fn empty_params() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl GeneratorRef {
    pub fn new(strategy: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            strategy: strategy.into(),
            params,
        }
    }
}

/// A concrete question produced by a generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub question: String,
    pub answer: String,
    /// Optional visual payload (e.g. inline SVG).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Text shown when a generator faults.
pub const PLACEHOLDER_TEXT: &str = "Error";

impl Instance {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// The visible stand-in for a failed generation.
    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER_TEXT, PLACEHOLDER_TEXT)
    }

    pub fn is_placeholder(&self) -> bool {
        self.question == PLACEHOLDER_TEXT && self.answer == PLACEHOLDER_TEXT
    }
}

/// An item a group has seen before and is now due to review.
///
/// The question and answer are the exact text shown last time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueRecord {
    pub item_id: String,
    pub topic: String,
    #[serde(default)]
    pub skill: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub question: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Interval (in lessons) the item was scheduled with.
    #[serde(default = "default_interval")]
    pub interval: u32,
    /// Lessons elapsed past the due point; 0 means due exactly now.
    #[serde(default)]
    pub overdue_by: u32,
}

fn default_interval() -> u32 {
    1
}

/// Scope filter for querying the question pool.
///
/// Empty lists and `None` fields do not constrain the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemFilter {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

impl ItemFilter {
    pub fn topics<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topics: topics.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    /// The narrowest scope for swapping a slot's item at a new difficulty:
    /// same skill if the item has one, otherwise same topic.
    pub fn retarget_scope(item_topic: &str, item_skill: Option<&str>, difficulty: Difficulty) -> Self {
        let mut filter = match item_skill {
            Some(skill) => Self {
                skills: vec![skill.to_string()],
                ..Default::default()
            },
            None => Self::topics([item_topic]),
        };
        filter.difficulty = Some(difficulty);
        filter
    }

    /// Whether an item passes this filter.
    pub fn matches(&self, item: &Item) -> bool {
        if !self.topics.is_empty() && !self.topics.iter().any(|t| t == &item.topic) {
            return false;
        }
        if !self.skills.is_empty() {
            match &item.skill {
                Some(skill) if self.skills.contains(skill) => {}
                _ => return false,
            }
        }
        if let Some(domain) = &self.domain {
            if item.domain.as_ref() != Some(domain) {
                return false;
            }
        }
        if let Some(difficulty) = self.difficulty {
            if item.difficulty != difficulty {
                return false;
            }
        }
        true
    }

    /// Apply the filter to an in-memory pool.
    pub fn apply<'a>(&self, items: &'a [Item]) -> Vec<&'a Item> {
        items.iter().filter(|item| self.matches(item)).collect()
    }
}

/// One row of a hand-built board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub topic: String,
    #[serde(default)]
    pub difficulty: Difficulty,
}

/// Stable identifier for a board slot.
///
/// Independent of display order, so shuffling never invalidates a
/// reference held by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub u32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

impl std::str::FromStr for SlotId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim_start_matches("slot-")
            .parse::<u32>()
            .map(SlotId)
            .map_err(|_| format!("invalid slot id: {s}"))
    }
}

/// Ids of items referenced by a set of due records.
pub fn due_item_ids(records: &[DueRecord]) -> HashSet<String> {
    records.iter().map(|r| r.item_id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, topic: &str, skill: Option<&str>, difficulty: Difficulty) -> Item {
        Item {
            id: id.into(),
            domain: Some("Number".into()),
            topic: topic.into(),
            skill: skill.map(Into::into),
            difficulty,
            generator: GeneratorRef::new("static", serde_json::json!({})),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = ItemFilter::default();
        assert!(filter.matches(&item("a", "Fractions", None, Difficulty::Level1)));
    }

    #[test]
    fn filter_by_topic_skill_domain_and_difficulty() {
        let a = item("a", "Fractions", Some("simplify"), Difficulty::Level1);
        let b = item("b", "Fractions", Some("add"), Difficulty::Level3);
        let c = item("c", "Angles", None, Difficulty::Level1);
        let pool = vec![a, b, c];

        let by_topic = ItemFilter::topics(["Fractions"]).apply(&pool);
        assert_eq!(by_topic.len(), 2);

        let by_difficulty = ItemFilter::default()
            .with_difficulty(Difficulty::Level1)
            .apply(&pool);
        assert_eq!(by_difficulty.len(), 2);

        let by_skill = ItemFilter {
            skills: vec!["add".into()],
            ..Default::default()
        }
        .apply(&pool);
        assert_eq!(by_skill.len(), 1);
        assert_eq!(by_skill[0].id, "b");

        let wrong_domain = ItemFilter {
            domain: Some("Geometry".into()),
            ..Default::default()
        }
        .apply(&pool);
        assert!(wrong_domain.is_empty());
    }

    #[test]
    fn retarget_scope_prefers_skill_over_topic() {
        let with_skill =
            ItemFilter::retarget_scope("Fractions", Some("simplify"), Difficulty::Level3);
        assert_eq!(with_skill.skills, vec!["simplify".to_string()]);
        assert!(with_skill.topics.is_empty());
        assert_eq!(with_skill.difficulty, Some(Difficulty::Level3));

        let topic_only = ItemFilter::retarget_scope("Angles", None, Difficulty::Level1);
        assert_eq!(topic_only.topics, vec!["Angles".to_string()]);
        assert!(topic_only.skills.is_empty());
    }

    #[test]
    fn slot_id_display_and_parse() {
        assert_eq!(SlotId(3).to_string(), "slot-3");
        assert_eq!("slot-3".parse::<SlotId>().unwrap(), SlotId(3));
        assert_eq!("4".parse::<SlotId>().unwrap(), SlotId(4));
        assert!("slot-x".parse::<SlotId>().is_err());
    }

    #[test]
    fn item_deserializes_heterogeneous_difficulty() {
        let json = r#"{
            "id": "q1",
            "topic": "Fractions",
            "difficulty": "Hard",
            "generator": {"strategy": "static", "params": {"question": "1/2 + 1/2", "answer": "1"}}
        }"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.difficulty, Difficulty::Level3);
        assert!(item.skill.is_none());
    }

    #[test]
    fn placeholder_instance() {
        let p = Instance::placeholder();
        assert!(p.is_placeholder());
        assert!(!Instance::new("1 + 1", "2").is_placeholder());
    }
}
