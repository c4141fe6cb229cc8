//! Session statistics.
//!
//! Summaries over rated results: how many questions were answered, the mean
//! score, and the share that were mostly or fully right.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::interval::Rating;
use crate::session::{Session, SessionResult};

/// Scores at or above this count as a success.
pub const SUCCESS_THRESHOLD: u32 = 75;

/// Aggregate statistics for one or more sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Sessions covered.
    pub sessions: usize,
    /// Rated results.
    pub answered: usize,
    /// Results left unrated.
    pub unrated: usize,
    /// Mean score over rated results, `None` if nothing was rated.
    pub mean_score: Option<f64>,
    /// Share of rated results scoring at least [`SUCCESS_THRESHOLD`], in `[0, 1]`.
    pub success_rate: Option<f64>,
    /// Count of results per score.
    pub per_rating: BTreeMap<u32, usize>,
}

impl SessionStats {
    pub fn from_session(session: &Session) -> Self {
        Self::from_sessions(std::slice::from_ref(session))
    }

    pub fn from_sessions(sessions: &[Session]) -> Self {
        let mut stats = Self::from_results(sessions.iter().flat_map(|s| s.results.iter()));
        stats.sessions = sessions.len();
        stats
    }

    fn from_results<'a>(results: impl IntoIterator<Item = &'a SessionResult>) -> Self {
        let mut stats = Self {
            per_rating: Rating::ALL.iter().map(|r| (r.score(), 0)).collect(),
            ..Default::default()
        };
        let mut total = 0u64;
        let mut successes = 0usize;

        for result in results {
            match result.rating {
                Some(rating) => {
                    let score = rating.score();
                    stats.answered += 1;
                    total += u64::from(score);
                    if score >= SUCCESS_THRESHOLD {
                        successes += 1;
                    }
                    *stats.per_rating.entry(score).or_default() += 1;
                }
                None => stats.unrated += 1,
            }
        }

        if stats.answered > 0 {
            let n = stats.answered as f64;
            stats.mean_score = Some(total as f64 / n);
            stats.success_rate = Some(successes as f64 / n);
        }
        stats
    }
}

/// Statistics per topic across sessions, keyed by topic name.
pub fn stats_by_topic(sessions: &[Session]) -> BTreeMap<String, SessionStats> {
    let mut grouped: BTreeMap<String, Vec<&SessionResult>> = BTreeMap::new();
    for result in sessions.iter().flat_map(|s| s.results.iter()) {
        grouped.entry(result.topic.clone()).or_default().push(result);
    }

    grouped
        .into_iter()
        .map(|(topic, results)| {
            let mut stats = SessionStats::from_results(results);
            stats.sessions = sessions
                .iter()
                .filter(|s| s.results.iter().any(|r| r.topic == topic))
                .count();
            (topic, stats)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::SlotOrigin;
    use crate::model::SlotId;
    use chrono::Utc;
    use uuid::Uuid;

    fn session(entries: &[(&str, Option<u32>)]) -> Session {
        Session {
            id: Uuid::new_v4(),
            group_id: "7R".into(),
            created_at: Utc::now(),
            results: entries
                .iter()
                .enumerate()
                .map(|(i, (topic, score))| {
                    let rating = score.and_then(Rating::from_score);
                    SessionResult {
                        slot_id: SlotId(i as u32),
                        item_id: format!("item-{i}"),
                        topic: topic.to_string(),
                        skill: None,
                        difficulty: Default::default(),
                        origin: SlotOrigin::Generated,
                        question: "q".into(),
                        answer: "a".into(),
                        image: None,
                        rating,
                        interval: crate::interval::interval_for(rating),
                    }
                })
                .collect(),
        }
    }

    #[test]
    fn single_session_summary() {
        let s = session(&[
            ("Ratio", Some(100)),
            ("Ratio", Some(75)),
            ("Angles", Some(25)),
            ("Angles", Some(0)),
            ("Angles", None),
        ]);
        let stats = SessionStats::from_session(&s);
        assert_eq!(stats.sessions, 1);
        assert_eq!(stats.answered, 4);
        assert_eq!(stats.unrated, 1);
        assert_eq!(stats.mean_score, Some(50.0));
        assert_eq!(stats.success_rate, Some(0.5));
        assert_eq!(stats.per_rating[&100], 1);
        assert_eq!(stats.per_rating[&25], 1);
    }

    #[test]
    fn nothing_rated_has_no_averages() {
        let stats = SessionStats::from_session(&session(&[("Ratio", None)]));
        assert_eq!(stats.answered, 0);
        assert!(stats.mean_score.is_none());
        assert!(stats.success_rate.is_none());
        assert_eq!(stats.per_rating.len(), 4);
    }

    #[test]
    fn across_sessions_and_topics() {
        let sessions = vec![
            session(&[("Ratio", Some(100)), ("Angles", Some(0))]),
            session(&[("Ratio", Some(75))]),
        ];
        let all = SessionStats::from_sessions(&sessions);
        assert_eq!(all.sessions, 2);
        assert_eq!(all.answered, 3);

        let by_topic = stats_by_topic(&sessions);
        assert_eq!(by_topic["Ratio"].sessions, 2);
        assert_eq!(by_topic["Ratio"].success_rate, Some(1.0));
        assert_eq!(by_topic["Angles"].sessions, 1);
        assert_eq!(by_topic["Angles"].mean_score, Some(0.0));
    }
}
