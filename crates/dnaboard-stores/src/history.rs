//! Due computation from recorded sessions.
//!
//! Intervals are counted in lessons, and every recorded session of a group
//! is one lesson. With `n` sessions on record and an item's latest result in
//! session `k` (0-based, oldest first), the item is due once
//! `n - k >= interval` and is overdue by `n - k - interval`.

use std::collections::HashMap;

use dnaboard_core::model::DueRecord;
use dnaboard_core::session::{Session, SessionResult};

/// Items due for review, most overdue first, then most recently seen.
///
/// `sessions` must all belong to one group; they are ordered by
/// `created_at` here, so callers may pass them in any order.
pub fn due_records(sessions: &[Session]) -> Vec<DueRecord> {
    let mut ordered: Vec<&Session> = sessions.iter().collect();
    ordered.sort_by_key(|s| s.created_at);
    let lessons = ordered.len();

    // Latest result per item, with the lesson it was recorded in.
    let mut latest: HashMap<&str, (usize, &SessionResult)> = HashMap::new();
    for (lesson, session) in ordered.iter().enumerate() {
        for result in &session.results {
            latest.insert(result.item_id.as_str(), (lesson, result));
        }
    }

    let mut due: Vec<(usize, DueRecord)> = latest
        .into_values()
        .filter_map(|(lesson, result)| {
            let elapsed = u32::try_from(lessons - lesson).unwrap_or(u32::MAX);
            let interval = result.interval.max(1);
            (elapsed >= interval).then(|| {
                (
                    lesson,
                    DueRecord {
                        item_id: result.item_id.clone(),
                        topic: result.topic.clone(),
                        skill: result.skill.clone(),
                        difficulty: result.difficulty,
                        question: result.question.clone(),
                        answer: result.answer.clone(),
                        image: result.image.clone(),
                        interval,
                        overdue_by: elapsed - interval,
                    },
                )
            })
        })
        .collect();

    due.sort_by(|(la, a), (lb, b)| {
        b.overdue_by
            .cmp(&a.overdue_by)
            .then(lb.cmp(la))
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    due.into_iter().map(|(_, record)| record).collect()
}
