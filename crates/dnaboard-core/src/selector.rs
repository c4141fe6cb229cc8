//! Due-item selection.

use crate::model::DueRecord;
use crate::traits::SchedulingStore;

/// Fetch the records due for `group_id`, keeping store order and at most
/// `cap` of them.
///
/// Due items are a bonus: if the store fails the board is built from fresh
/// items alone, so errors are logged and an empty list is returned.
pub async fn select_due(
    store: &dyn SchedulingStore,
    group_id: &str,
    cap: Option<usize>,
) -> Vec<DueRecord> {
    let mut records = match store.due_items(group_id).await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(store = store.name(), group = group_id, "due items unavailable: {e:#}");
            return Vec::new();
        }
    };

    if let Some(cap) = cap {
        records.truncate(cap);
    }
    tracing::debug!(group = group_id, count = records.len(), "selected due items");
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::session::Session;
    use async_trait::async_trait;

    struct FixedStore(Vec<DueRecord>);

    #[async_trait]
    impl SchedulingStore for FixedStore {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn due_items(&self, _: &str) -> anyhow::Result<Vec<DueRecord>> {
            Ok(self.0.clone())
        }

        async fn record_session(&self, _: &Session) -> anyhow::Result<()> {
            Ok(())
        }
    }

    struct DownStore;

    #[async_trait]
    impl SchedulingStore for DownStore {
        fn name(&self) -> &str {
            "down"
        }

        async fn due_items(&self, _: &str) -> anyhow::Result<Vec<DueRecord>> {
            Err(StoreError::Unavailable("connection refused".into()).into())
        }

        async fn record_session(&self, _: &Session) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn record(id: &str) -> DueRecord {
        DueRecord {
            item_id: id.into(),
            topic: "Fractions".into(),
            skill: None,
            difficulty: Default::default(),
            question: format!("q-{id}"),
            answer: format!("a-{id}"),
            image: None,
            interval: 1,
            overdue_by: 0,
        }
    }

    #[tokio::test]
    async fn keeps_order_and_caps() {
        let store = FixedStore(vec![record("a"), record("b"), record("c")]);
        let due = select_due(&store, "7R", Some(2)).await;
        let ids: Vec<&str> = due.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let all = select_due(&store, "7R", None).await;
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn frozen_text_passes_through() {
        let store = FixedStore(vec![record("a")]);
        let due = select_due(&store, "7R", None).await;
        assert_eq!(due[0].question, "q-a");
        assert_eq!(due[0].answer, "a-a");
    }

    #[tokio::test]
    async fn store_failure_yields_empty() {
        let due = select_due(&DownStore, "7R", Some(6)).await;
        assert!(due.is_empty());
    }
}
