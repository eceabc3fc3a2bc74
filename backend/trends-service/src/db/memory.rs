/// In-memory Trend Store
///
/// Copy-and-swap snapshot: `apply` builds the next map off to the side and
/// replaces the shared `Arc` under the write lock, so a reader either holds
/// the previous snapshot or the fully applied one.
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{BatchOutcome, TrendBatch, TrendStore};
use crate::error::Result;
use crate::models::{PostId, TrendRecord};
use crate::services::trending::query::{allowed_ranking, paginate, sort_records, RankedView};

type Snapshot = BTreeMap<PostId, TrendRecord>;

#[derive(Debug, Default)]
pub struct InMemoryTrendStore {
    snapshot: RwLock<Arc<Snapshot>>,
}

impl InMemoryTrendStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store, bypassing refresh. Mostly useful for fixtures.
    pub fn with_records(records: impl IntoIterator<Item = TrendRecord>) -> Self {
        let snapshot: Snapshot = records.into_iter().map(|r| (r.id, r)).collect();
        Self {
            snapshot: RwLock::new(Arc::new(snapshot)),
        }
    }

    async fn current(&self) -> Arc<Snapshot> {
        self.snapshot.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.current().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.current().await.is_empty()
    }
}

#[async_trait]
impl TrendStore for InMemoryTrendStore {
    async fn tracked_ids(&self) -> Result<Vec<PostId>> {
        Ok(self.current().await.keys().copied().collect())
    }

    async fn apply(&self, batch: TrendBatch) -> Result<BatchOutcome> {
        let mut guard = self.snapshot.write().await;
        let mut next: Snapshot = (**guard).clone();

        let removed = batch
            .removed
            .iter()
            .filter(|id| next.remove(*id).is_some())
            .count() as u64;

        let upserted = batch.records.len() as u64;
        for record in batch.records {
            next.insert(record.id, record);
        }

        let before = next.len();
        next.retain(|_, record| record.score >= batch.decay_threshold);
        let pruned = (before - next.len()) as u64;

        *guard = Arc::new(next);

        Ok(BatchOutcome {
            upserted,
            removed,
            pruned,
        })
    }

    async fn find(&self, id: PostId) -> Result<Option<TrendRecord>> {
        Ok(self.current().await.get(&id).cloned())
    }

    async fn all(&self) -> Result<Vec<TrendRecord>> {
        Ok(self.current().await.values().cloned().collect())
    }

    async fn ordered(&self, view: &RankedView) -> Result<Vec<TrendRecord>> {
        let snapshot = self.current().await;
        let mut records: Vec<TrendRecord> = snapshot
            .values()
            .filter(|r| !view.allowed_only || r.allowed)
            .cloned()
            .collect();
        sort_records(&mut records, view.locale.as_ref());
        Ok(paginate(records, view.offset, view.limit))
    }

    async fn rank_of(&self, id: PostId) -> Result<Option<u64>> {
        let snapshot = self.current().await;
        let rank = allowed_ranking(snapshot.values())
            .iter()
            .position(|r| r.id == id)
            .map(|index| index as u64 + 1);
        Ok(rank)
    }

    async fn at_rank(&self, rank: u64) -> Result<Option<TrendRecord>> {
        if rank == 0 {
            return Ok(None);
        }
        let snapshot = self.current().await;
        let record = allowed_ranking(snapshot.values())
            .into_iter()
            .nth((rank - 1) as usize);
        Ok(record)
    }

    async fn ids_by_allowed(&self, allowed: bool, limit: usize) -> Result<Vec<PostId>> {
        Ok(self
            .current()
            .await
            .values()
            .filter(|r| r.allowed == allowed)
            .take(limit)
            .map(|r| r.id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::trending::query::LocalePreference;

    fn record(id: PostId, score: f64, allowed: bool) -> TrendRecord {
        TrendRecord {
            id,
            account_id: 100 + id,
            score,
            language: Some("en".to_string()),
            allowed,
        }
    }

    #[tokio::test]
    async fn test_apply_upserts_then_prunes() {
        let store =
            InMemoryTrendStore::with_records(vec![record(1, 5.0, true), record(2, 4.0, true)]);

        let outcome = store
            .apply(TrendBatch {
                records: vec![record(1, 0.1, true), record(3, 8.0, false)],
                removed: vec![],
                decay_threshold: 0.3,
            })
            .await
            .unwrap();

        assert_eq!(
            outcome,
            BatchOutcome {
                upserted: 2,
                removed: 0,
                pruned: 1
            }
        );
        assert_eq!(store.tracked_ids().await.unwrap(), vec![2, 3]);
        assert_eq!(store.find(3).await.unwrap().unwrap().score, 8.0);
        assert!(store.find(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prune_keeps_records_at_floor() {
        let store = InMemoryTrendStore::new();
        store
            .apply(TrendBatch {
                records: vec![record(1, 0.3, true), record(2, 0.2999, true)],
                removed: vec![],
                decay_threshold: 0.3,
            })
            .await
            .unwrap();

        assert_eq!(store.tracked_ids().await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_removed_records_are_dropped() {
        let store =
            InMemoryTrendStore::with_records(vec![record(1, 5.0, true), record(2, 4.0, true)]);

        let outcome = store
            .apply(TrendBatch {
                records: vec![record(2, 4.0, true)],
                removed: vec![1, 42],
                decay_threshold: 0.3,
            })
            .await
            .unwrap();

        assert_eq!(outcome.removed, 1);
        assert_eq!(store.tracked_ids().await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_rank_among_allowed_only() {
        let store = InMemoryTrendStore::with_records(vec![
            record(1, 10.0, true),
            record(2, 50.0, false),
            record(3, 7.0, true),
            record(4, 7.0, true),
        ]);

        assert_eq!(store.rank_of(1).await.unwrap(), Some(1));
        assert_eq!(store.rank_of(3).await.unwrap(), Some(2));
        assert_eq!(store.rank_of(4).await.unwrap(), Some(3));
        assert_eq!(store.rank_of(2).await.unwrap(), None);
        assert_eq!(store.rank_of(99).await.unwrap(), None);

        assert_eq!(store.at_rank(2).await.unwrap().map(|r| r.id), Some(3));
        assert!(store.at_rank(4).await.unwrap().is_none());
        assert!(store.at_rank(0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ordered_view() {
        let mut german = record(5, 1.0, true);
        german.language = Some("de".to_string());
        let store = InMemoryTrendStore::with_records(vec![
            record(1, 10.0, true),
            record(2, 20.0, false),
            german,
        ]);

        let all = store.ordered(&RankedView::default()).await.unwrap();
        assert_eq!(all.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 1, 5]);

        let view = RankedView {
            allowed_only: true,
            locale: Some(LocalePreference {
                locale: "de".to_string(),
                default_locale: "en".to_string(),
            }),
            ..RankedView::default()
        };
        let localized = store.ordered(&view).await.unwrap();
        assert_eq!(localized.iter().map(|r| r.id).collect::<Vec<_>>(), vec![5, 1]);

        let page = RankedView {
            offset: 1,
            limit: Some(1),
            ..RankedView::default()
        };
        let second = store.ordered(&page).await.unwrap();
        assert_eq!(second.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1]);
    }

    #[tokio::test]
    async fn test_ids_by_allowed() {
        let store = InMemoryTrendStore::with_records(vec![
            record(1, 1.0, true),
            record(2, 2.0, false),
            record(3, 3.0, true),
            record(4, 4.0, true),
        ]);

        assert_eq!(store.ids_by_allowed(true, 2).await.unwrap(), vec![1, 3]);
        assert_eq!(store.ids_by_allowed(false, 10).await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_reader_snapshot_is_stable_across_apply() {
        let store = InMemoryTrendStore::with_records(vec![record(1, 5.0, true)]);
        let before = store.current().await;

        store
            .apply(TrendBatch {
                records: vec![record(1, 0.0, true)],
                removed: vec![],
                decay_threshold: 0.3,
            })
            .await
            .unwrap();

        assert_eq!(before.len(), 1);
        assert!(store.is_empty().await);
    }
}
