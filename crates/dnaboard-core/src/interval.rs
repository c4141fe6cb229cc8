//! Rating to review-interval mapping.
//!
//! Intervals are measured in lessons. The table is fixed; it is not a
//! formula and should not be tuned per caller.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::BoardError;

/// Interval for an unrated slot or an unknown score.
pub const DEFAULT_INTERVAL: u32 = 1;

/// A teacher's judgement of how well the group answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Rating {
    /// "NOPE!": nobody got it.
    Nope,
    /// "SOME": a few got it.
    Partial,
    /// "MOST": most got it.
    Most,
    /// "100%": everyone got it.
    Full,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Nope, Rating::Partial, Rating::Most, Rating::Full];

    pub fn from_score(score: u32) -> Option<Rating> {
        match score {
            0 => Some(Rating::Nope),
            25 => Some(Rating::Partial),
            75 => Some(Rating::Most),
            100 => Some(Rating::Full),
            _ => None,
        }
    }

    pub fn score(self) -> u32 {
        match self {
            Rating::Nope => 0,
            Rating::Partial => 25,
            Rating::Most => 75,
            Rating::Full => 100,
        }
    }

    /// Lessons until the item should come back.
    pub fn interval(self) -> u32 {
        match self {
            Rating::Nope => 1,
            Rating::Partial => 3,
            Rating::Most => 6,
            Rating::Full => 12,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rating::Nope => "NOPE!",
            Rating::Partial => "SOME",
            Rating::Most => "MOST",
            Rating::Full => "100%",
        }
    }
}

/// Interval for a possibly-missing rating.
pub fn interval_for(rating: Option<Rating>) -> u32 {
    rating.map(Rating::interval).unwrap_or(DEFAULT_INTERVAL)
}

/// Interval for a raw score. Anything outside {0, 25, 75, 100} maps to
/// [`DEFAULT_INTERVAL`].
pub fn interval_for_score(score: Option<u32>) -> u32 {
    interval_for(score.and_then(Rating::from_score))
}

impl TryFrom<u32> for Rating {
    type Error = BoardError;

    fn try_from(score: u32) -> Result<Self, Self::Error> {
        Rating::from_score(score).ok_or(BoardError::InvalidRating(score))
    }
}

impl From<Rating> for u32 {
    fn from(rating: Rating) -> Self {
        rating.score()
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.score())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_interval_table() {
        assert_eq!(interval_for_score(Some(0)), 1);
        assert_eq!(interval_for_score(Some(25)), 3);
        assert_eq!(interval_for_score(Some(75)), 6);
        assert_eq!(interval_for_score(Some(100)), 12);
    }

    #[test]
    fn unknown_or_missing_scores_default_to_one() {
        assert_eq!(interval_for_score(None), 1);
        for score in [1, 24, 50, 76, 99, 101, 1000, u32::MAX] {
            assert_eq!(interval_for_score(Some(score)), 1, "score {score}");
        }
        assert_eq!(interval_for(None), DEFAULT_INTERVAL);
    }

    #[test]
    fn score_round_trips_through_rating() {
        for rating in Rating::ALL {
            assert_eq!(Rating::from_score(rating.score()), Some(rating));
        }
        assert!(Rating::try_from(50).is_err());
    }

    #[test]
    fn serde_uses_numeric_score() {
        assert_eq!(serde_json::to_string(&Rating::Most).unwrap(), "75");
        let r: Rating = serde_json::from_str("25").unwrap();
        assert_eq!(r, Rating::Partial);
        assert!(serde_json::from_str::<Rating>("30").is_err());
    }
}
