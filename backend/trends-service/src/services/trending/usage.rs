/// Usage Tracking
///
/// Records which posts were interacted with, bucketed per UTC day. A refresh
/// asks for the bucket of its own day; older buckets expire after one day.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use std::collections::HashSet;
use tracing::debug;

use crate::error::Result;
use crate::models::PostId;
use crate::utils::day_start;

pub(crate) const BUCKET_SECS: i64 = 86_400;

#[async_trait]
pub trait UsageTracker: Send + Sync {
    /// Marks `post_id` as used at `at`.
    async fn record(&self, post_id: PostId, at: DateTime<Utc>) -> Result<()>;

    /// Posts used during the UTC day containing `at`.
    async fn recently_used(&self, at: DateTime<Utc>) -> Result<HashSet<PostId>>;
}

/// Process-local tracker. Inserts only take a shard lock, so hot-path
/// recording never waits on a refresh reading a different bucket.
#[derive(Debug, Default)]
pub struct InMemoryUsageTracker {
    buckets: DashMap<i64, DashSet<PostId>>,
}

impl InMemoryUsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn expire_before(&self, bucket: i64) {
        let cutoff = bucket - BUCKET_SECS;
        let before = self.buckets.len();
        self.buckets.retain(|key, _| *key >= cutoff);
        let dropped = before.saturating_sub(self.buckets.len());
        if dropped > 0 {
            debug!(dropped, cutoff, "Expired usage buckets");
        }
    }
}

#[async_trait]
impl UsageTracker for InMemoryUsageTracker {
    async fn record(&self, post_id: PostId, at: DateTime<Utc>) -> Result<()> {
        let bucket = day_start(at);

        if let Some(ids) = self.buckets.get(&bucket) {
            ids.insert(post_id);
            return Ok(());
        }

        self.buckets.entry(bucket).or_default().insert(post_id);
        self.expire_before(bucket);
        Ok(())
    }

    async fn recently_used(&self, at: DateTime<Utc>) -> Result<HashSet<PostId>> {
        let ids = self
            .buckets
            .get(&day_start(at))
            .map(|ids| ids.iter().map(|id| *id).collect())
            .unwrap_or_default();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_records_within_same_day() {
        let tracker = InMemoryUsageTracker::new();
        tracker.record(1, noon()).await.unwrap();
        tracker.record(2, noon() + Duration::hours(3)).await.unwrap();
        tracker.record(1, noon() + Duration::hours(4)).await.unwrap();

        let used = tracker.recently_used(noon() + Duration::hours(5)).await.unwrap();
        assert_eq!(used, HashSet::from([1, 2]));
    }

    #[tokio::test]
    async fn test_next_day_starts_empty() {
        let tracker = InMemoryUsageTracker::new();
        tracker.record(1, noon()).await.unwrap();

        let used = tracker.recently_used(noon() + Duration::days(1)).await.unwrap();
        assert!(used.is_empty());
    }

    #[tokio::test]
    async fn test_old_buckets_expire() {
        let tracker = InMemoryUsageTracker::new();
        tracker.record(1, noon()).await.unwrap();
        tracker.record(2, noon() + Duration::days(1)).await.unwrap();
        assert_eq!(tracker.bucket_count(), 2);

        tracker.record(3, noon() + Duration::days(2)).await.unwrap();
        assert_eq!(tracker.bucket_count(), 2);
        assert!(tracker.recently_used(noon()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_records() {
        let tracker = Arc::new(InMemoryUsageTracker::new());
        let mut handles = Vec::new();

        for task in 0..8i64 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(async move {
                for n in 0..100i64 {
                    tracker.record(task * 100 + n, noon()).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(tracker.recently_used(noon()).await.unwrap().len(), 800);
    }
}
