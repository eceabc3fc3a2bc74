/// Trending Service
///
/// Entry point for the rest of the platform: usage registration, the refresh
/// and review cycle, and read queries over the trend store.
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::compute::{RefreshSummary, TrendingComputeService};
use super::query::TrendQuery;
use super::review::ReviewGate;
use super::usage::UsageTracker;
use crate::config::TrendingOptions;
use crate::db::{AccountRepository, ExclusionFilter, PostRepository, TrendStore};
use crate::error::Result;
use crate::models::{Post, PostId, TrendRecord};

/// Collaborators the service is wired with.
#[derive(Clone)]
pub struct TrendingBackends {
    pub usage: Arc<dyn UsageTracker>,
    pub store: Arc<dyn TrendStore>,
    pub posts: Arc<dyn PostRepository>,
    pub accounts: Arc<dyn AccountRepository>,
    pub exclusions: Arc<dyn ExclusionFilter>,
}

pub struct TrendingService {
    compute: TrendingComputeService,
    review: ReviewGate,
    store: Arc<dyn TrendStore>,
    posts: Arc<dyn PostRepository>,
    exclusions: Arc<dyn ExclusionFilter>,
    default_locale: String,
}

impl TrendingService {
    pub fn new(
        options: &TrendingOptions,
        default_locale: impl Into<String>,
        backends: TrendingBackends,
    ) -> Result<Self> {
        options.validate()?;

        let compute = TrendingComputeService::new(
            options,
            backends.usage,
            backends.store.clone(),
            backends.posts.clone(),
        )?;
        let review = ReviewGate::new(
            options,
            backends.store.clone(),
            backends.posts.clone(),
            backends.accounts,
        )?;

        Ok(Self {
            compute,
            review,
            store: backends.store,
            posts: backends.posts,
            exclusions: backends.exclusions,
            default_locale: default_locale.into(),
        })
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Counts an interaction with `post` (resolved through reshares) at `at`.
    pub async fn register(&self, post: &Post, at: DateTime<Utc>) -> Result<bool> {
        self.compute.register(post, at).await
    }

    pub async fn refresh(&self, now: DateTime<Utc>) -> Result<RefreshSummary> {
        self.compute.refresh(now).await
    }

    pub async fn request_review(&self, now: DateTime<Utc>) -> Result<Vec<Post>> {
        self.review.request_review(now).await
    }

    pub async fn at_review_threshold(&self) -> Result<Option<TrendRecord>> {
        self.review.at_review_threshold().await
    }

    pub async fn score_at_rank(&self, rank: u64) -> Result<Option<f64>> {
        self.review.score_at_rank(rank).await
    }

    /// Current score, `None` when the post is not tracked.
    pub async fn score(&self, id: PostId) -> Result<Option<f64>> {
        Ok(self.store.find(id).await?.map(|record| record.score))
    }

    /// 1-based rank among allowed records.
    pub async fn rank(&self, id: PostId) -> Result<Option<u64>> {
        self.store.rank_of(id).await
    }

    pub async fn currently_trending_ids(&self, allowed: bool, limit: usize) -> Result<Vec<PostId>> {
        self.store.ids_by_allowed(allowed, limit).await
    }

    pub async fn query(&self, query: &TrendQuery) -> Result<Vec<TrendRecord>> {
        query
            .execute(
                self.store.as_ref(),
                self.exclusions.as_ref(),
                &self.default_locale,
            )
            .await
    }

    /// Posts behind `query`, in ranked order. Posts that no longer resolve are skipped.
    pub async fn trending_posts(&self, query: &TrendQuery) -> Result<Vec<Post>> {
        let records = self.query(query).await?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<PostId> = records.iter().map(|r| r.id).collect();
        let mut by_id: HashMap<PostId, Post> = self
            .posts
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|post| (post.id, post))
            .collect();

        let posts: Vec<Post> = ids.iter().filter_map(|id| by_id.remove(id)).collect();

        debug!(
            requested = ids.len(),
            resolved = posts.len(),
            "Hydrated trending posts"
        );

        Ok(posts)
    }
}
