//! Difficulty normalization.
//!
//! Question banks encode difficulty in several ways (`"•••"`, `"3"`, `3`,
//! `"Hard"`, `"level 3"`). Everything is folded into [`Difficulty`] once, at
//! the deserialization boundary, and the rest of the engine only ever sees
//! the canonical three-level enum.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical difficulty level.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(from = "RawDifficulty", into = "RawDifficulty")]
pub enum Difficulty {
    Level1,
    #[default]
    Level2,
    Level3,
}

/// A difficulty exactly as it appears in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDifficulty {
    Number(f64),
    Text(String),
}

impl From<&str> for RawDifficulty {
    fn from(s: &str) -> Self {
        RawDifficulty::Text(s.to_string())
    }
}

impl From<f64> for RawDifficulty {
    fn from(n: f64) -> Self {
        RawDifficulty::Number(n)
    }
}

/// Presentation details for a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyInfo {
    pub level: u8,
    pub symbol: &'static str,
    pub name: &'static str,
}

// Raw spellings found in stored rows. `encodings()` returns these for
// `in.(...)` filters and `from_alias` matches them case-insensitively, so
// both directions read the same table.
const LEVEL1_ENCODINGS: &[&str] = &[
    "•", "1", "easy", "Easy", "level 1", "Level 1", "level1", "Level1", "l1", "L1",
];
const LEVEL2_ENCODINGS: &[&str] = &[
    "••", "2", "medium", "Medium", "level 2", "Level 2", "level2", "Level2", "l2", "L2",
];
const LEVEL3_ENCODINGS: &[&str] = &[
    "•••", "3", "hard", "Hard", "level 3", "Level 3", "level3", "Level3", "l3", "L3",
];

impl Difficulty {
    /// All levels, easiest first.
    pub const ALL: [Difficulty; 3] = [Difficulty::Level1, Difficulty::Level2, Difficulty::Level3];

    /// Map any stored encoding to a canonical level.
    ///
    /// Total: anything unrecognized becomes [`Difficulty::Level2`].
    pub fn normalize(raw: &RawDifficulty) -> Difficulty {
        match raw {
            RawDifficulty::Number(n) => Self::from_number(*n).unwrap_or_default(),
            RawDifficulty::Text(s) => Self::from_alias(s).unwrap_or_default(),
        }
    }

    /// Normalize a string encoding.
    pub fn normalize_str(raw: &str) -> Difficulty {
        Self::from_alias(raw).unwrap_or_default()
    }

    fn from_number(n: f64) -> Option<Difficulty> {
        if n.fract() != 0.0 {
            return None;
        }
        match n as i64 {
            1 => Some(Difficulty::Level1),
            2 => Some(Difficulty::Level2),
            3 => Some(Difficulty::Level3),
            _ => None,
        }
    }

    fn from_alias(s: &str) -> Option<Difficulty> {
        let key = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|level| {
            level
                .encodings()
                .iter()
                .any(|raw| raw.to_lowercase() == key)
        })
    }

    /// Every raw encoding that normalizes to this level.
    pub fn encodings(self) -> &'static [&'static str] {
        match self {
            Difficulty::Level1 => LEVEL1_ENCODINGS,
            Difficulty::Level2 => LEVEL2_ENCODINGS,
            Difficulty::Level3 => LEVEL3_ENCODINGS,
        }
    }

    pub fn level(self) -> u8 {
        self.info().level
    }

    pub fn symbol(self) -> &'static str {
        self.info().symbol
    }

    pub fn info(self) -> DifficultyInfo {
        match self {
            Difficulty::Level1 => DifficultyInfo {
                level: 1,
                symbol: "•",
                name: "Easy",
            },
            Difficulty::Level2 => DifficultyInfo {
                level: 2,
                symbol: "••",
                name: "Medium",
            },
            Difficulty::Level3 => DifficultyInfo {
                level: 3,
                symbol: "•••",
                name: "Hard",
            },
        }
    }
}

/// Whether two raw encodings land on the same level.
pub fn same_level(a: &RawDifficulty, b: &RawDifficulty) -> bool {
    Difficulty::normalize(a) == Difficulty::normalize(b)
}

impl From<RawDifficulty> for Difficulty {
    fn from(raw: RawDifficulty) -> Self {
        Difficulty::normalize(&raw)
    }
}

impl From<Difficulty> for RawDifficulty {
    fn from(d: Difficulty) -> Self {
        RawDifficulty::Text(d.symbol().to_string())
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    /// Strict parse, for CLI arguments. Use [`Difficulty::normalize_str`]
    /// when reading stored data.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_alias(s).ok_or_else(|| format!("unknown difficulty: {s}"))
    }
}
