//! Persistence seams of the trends engine.
//!
//! `TrendStore` owns the trending snapshot. The other traits adapt data owned
//! by other parts of the platform (posts, accounts, viewer relationships).

pub mod account_repo;
pub mod memory;
pub mod post_repo;
pub mod trending_repo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use std::collections::HashSet;

#[cfg(test)]
use mockall::automock;

use crate::error::Result;
use crate::models::{AccountId, Post, PostId, TrendRecord};
use crate::services::trending::query::RankedView;

pub use account_repo::{PgAccountRepository, PgExclusionFilter};
pub use memory::InMemoryTrendStore;
pub use post_repo::PgPostRepository;
pub use trending_repo::{PgTrendStore, APPLY_LOCK_KEY};

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// One refresh worth of writes: drop records whose post is gone, upsert every
/// scored record, then prune below the floor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendBatch {
    pub records: Vec<TrendRecord>,
    pub removed: Vec<PostId>,
    pub decay_threshold: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub upserted: u64,
    pub removed: u64,
    pub pruned: u64,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait TrendStore: Send + Sync {
    /// Ids of every tracked record.
    async fn tracked_ids(&self) -> Result<Vec<PostId>>;

    /// Applies the batch atomically. Readers see the state before or after, never between,
    /// and concurrent applies (including from other processes) never interleave.
    async fn apply(&self, batch: TrendBatch) -> Result<BatchOutcome>;

    async fn find(&self, id: PostId) -> Result<Option<TrendRecord>>;

    async fn all(&self) -> Result<Vec<TrendRecord>>;

    /// Records in locale tier / score / id order, windowed by the view's offset and limit.
    async fn ordered(&self, view: &RankedView) -> Result<Vec<TrendRecord>>;

    /// 1-based rank of `id` among allowed records.
    async fn rank_of(&self, id: PostId) -> Result<Option<u64>>;

    /// Allowed record at 1-based `rank`.
    async fn at_rank(&self, rank: u64) -> Result<Option<TrendRecord>>;

    /// Up to `limit` ids with the given allowed flag, in storage order.
    async fn ids_by_allowed(&self, allowed: bool, limit: usize) -> Result<Vec<PostId>>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Posts for `ids` with counters and account flags; missing posts are skipped.
    async fn find_by_ids(&self, ids: &[PostId]) -> Result<Vec<Post>>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn mark_review_requested(&self, account_id: AccountId, at: DateTime<Utc>) -> Result<()>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ExclusionFilter: Send + Sync {
    /// Subset of `candidates` hidden from `viewer` (blocks, mutes, domain blocks).
    async fn excluded_account_ids(
        &self,
        viewer: AccountId,
        candidates: &[AccountId],
    ) -> Result<HashSet<AccountId>>;
}

/// Exclusion filter that hides nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExclusions;

#[async_trait]
impl ExclusionFilter for NoExclusions {
    async fn excluded_account_ids(
        &self,
        _viewer: AccountId,
        _candidates: &[AccountId],
    ) -> Result<HashSet<AccountId>> {
        Ok(HashSet::new())
    }
}
