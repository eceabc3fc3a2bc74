/// Trending Compute Service
///
/// Periodic refresh of the trend store: gather candidates, score them and
/// apply the batch in one atomic step.
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::algorithm::TrendingAlgorithm;
use super::eligibility::is_eligible;
use super::usage::UsageTracker;
use crate::config::TrendingOptions;
use crate::db::{PostRepository, TrendBatch, TrendStore};
use crate::error::Result;
use crate::metrics;
use crate::models::{Post, PostId, TrendRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub candidates: usize,
    pub resolved: usize,
    pub upserted: u64,
    pub removed: u64,
    pub pruned: u64,
}

impl RefreshSummary {
    /// Records left in the store once the batch is applied.
    pub fn tracked(&self) -> u64 {
        self.upserted.saturating_sub(self.pruned)
    }
}

pub struct TrendingComputeService {
    usage: Arc<dyn UsageTracker>,
    store: Arc<dyn TrendStore>,
    posts: Arc<dyn PostRepository>,
    algorithm: TrendingAlgorithm,
    decay_threshold: f64,
    trendable_by_default: bool,
    refresh_lock: Mutex<()>,
}

impl TrendingComputeService {
    pub fn new(
        options: &TrendingOptions,
        usage: Arc<dyn UsageTracker>,
        store: Arc<dyn TrendStore>,
        posts: Arc<dyn PostRepository>,
    ) -> Result<Self> {
        Ok(Self {
            usage,
            store,
            posts,
            algorithm: TrendingAlgorithm::new(options)?,
            decay_threshold: options.decay_threshold,
            trendable_by_default: options.trendable_by_default,
            refresh_lock: Mutex::new(()),
        })
    }

    /// Records usage of the post behind `post` when it is eligible.
    ///
    /// Returns whether anything was recorded.
    pub async fn register(&self, post: &Post, at: DateTime<Utc>) -> Result<bool> {
        let post = post.proper();

        if !is_eligible(post) {
            return Ok(false);
        }

        self.usage.record(post.id, at).await?;
        Ok(true)
    }

    /// Rescores every candidate and rewrites the store.
    ///
    /// Overlapping calls queue behind each other. Any failure before the
    /// final `apply` leaves the store untouched.
    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<RefreshSummary> {
        let _guard = self.refresh_lock.lock().await;
        let start = Instant::now();

        let recently_used = self.usage.recently_used(now).await?;
        let tracked = self.store.tracked_ids().await?;

        let candidates: BTreeSet<PostId> = recently_used
            .into_iter()
            .chain(tracked.iter().copied())
            .collect();
        let candidate_ids: Vec<PostId> = candidates.into_iter().collect();

        debug!(
            candidates = candidate_ids.len(),
            tracked = tracked.len(),
            "Collected trending candidates"
        );

        let posts = self.posts.find_by_ids(&candidate_ids).await?;

        let resolved: HashSet<PostId> = posts.iter().map(|p| p.id).collect();
        let removed: Vec<PostId> = tracked
            .into_iter()
            .filter(|id| !resolved.contains(id))
            .collect();

        let records: Vec<TrendRecord> = posts
            .iter()
            .map(|post| self.score_post(post, now))
            .collect();

        let batch = TrendBatch {
            records,
            removed,
            decay_threshold: self.decay_threshold,
        };
        let outcome = self.store.apply(batch).await?;

        let summary = RefreshSummary {
            candidates: candidate_ids.len(),
            resolved: resolved.len(),
            upserted: outcome.upserted,
            removed: outcome.removed,
            pruned: outcome.pruned,
        };

        metrics::record_batch(summary.upserted, summary.pruned);
        metrics::set_tracked_records(summary.tracked() as i64);

        info!(
            candidates = summary.candidates,
            resolved = summary.resolved,
            upserted = summary.upserted,
            removed = summary.removed,
            pruned = summary.pruned,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Trending refresh applied"
        );

        Ok(summary)
    }

    fn score_post(&self, post: &Post, now: DateTime<Utc>) -> TrendRecord {
        TrendRecord {
            id: post.id,
            account_id: post.account_id(),
            score: self.algorithm.score(post, now),
            language: post.language.clone(),
            allowed: post.is_trendable(self.trendable_by_default),
        }
    }
}
