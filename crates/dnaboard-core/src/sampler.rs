//! Fresh-item sampling from the question pool.

use std::collections::HashSet;

use rand::seq::{index, IndexedRandom};

use crate::model::{Item, ItemFilter};
use crate::random::RandomSource;
use crate::traits::QuestionPoolStore;

/// Draw up to `count` distinct items, uniformly at random, from the items
/// matching `filter`, skipping any id in `exclude`.
///
/// A smaller pool returns everything it has. Store failures are logged and
/// treated as an empty pool.
pub async fn sample_pool(
    store: &dyn QuestionPoolStore,
    filter: &ItemFilter,
    count: usize,
    exclude: &HashSet<String>,
    rng: &mut dyn RandomSource,
) -> Vec<Item> {
    if count == 0 {
        return Vec::new();
    }

    let candidates = candidates(store, filter, exclude).await;
    let picked = choose_distinct(candidates, count, rng);
    tracing::debug!(
        store = store.name(),
        requested = count,
        sampled = picked.len(),
        "sampled pool"
    );
    picked
}

/// Draw a single item matching `filter`, or `None` if nothing matches.
///
/// Unlike [`sample_pool`], store errors are returned so the caller can tell
/// "nothing matches" apart from "pool unreachable".
pub async fn sample_one(
    store: &dyn QuestionPoolStore,
    filter: &ItemFilter,
    rng: &mut dyn RandomSource,
) -> anyhow::Result<Option<Item>> {
    let items = store.query_items(filter).await?;
    Ok(items.choose(rng).cloned())
}

async fn candidates(
    store: &dyn QuestionPoolStore,
    filter: &ItemFilter,
    exclude: &HashSet<String>,
) -> Vec<Item> {
    match store.query_items(filter).await {
        Ok(items) => items
            .into_iter()
            .filter(|item| !exclude.contains(&item.id))
            .collect(),
        Err(e) => {
            tracing::warn!(store = store.name(), "question pool unavailable: {e:#}");
            Vec::new()
        }
    }
}

/// Uniform sample without replacement, preserving nothing about input order.
pub fn choose_distinct<T>(mut pool: Vec<T>, count: usize, rng: &mut dyn RandomSource) -> Vec<T> {
    if pool.len() <= count {
        return pool;
    }
    let mut picked: Vec<usize> = index::sample(rng, pool.len(), count).into_vec();
    // Remove from the back so earlier indices stay valid.
    picked.sort_unstable_by(|a, b| b.cmp(a));
    let mut out: Vec<T> = picked.into_iter().map(|i| pool.swap_remove(i)).collect();
    out.reverse();
    out
}
