/// Review Gate
///
/// Escalates posts that would rank above the visible boundary
/// (`review_threshold`) but have not been allowed by a moderator yet.
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::query::by_score;
use crate::config::TrendingOptions;
use crate::db::{AccountRepository, PostRepository, TrendStore};
use crate::error::Result;
use crate::metrics;
use crate::models::{AccountId, Post, PostId, TrendRecord};

pub struct ReviewGate {
    store: Arc<dyn TrendStore>,
    posts: Arc<dyn PostRepository>,
    accounts: Arc<dyn AccountRepository>,
    review_threshold: u64,
    trendable_by_default: bool,
}

impl ReviewGate {
    pub fn new(
        options: &TrendingOptions,
        store: Arc<dyn TrendStore>,
        posts: Arc<dyn PostRepository>,
        accounts: Arc<dyn AccountRepository>,
    ) -> Result<Self> {
        options.validate()?;

        Ok(Self {
            store,
            posts,
            accounts,
            review_threshold: options.review_threshold,
            trendable_by_default: options.trendable_by_default,
        })
    }

    /// Score of the allowed record at 1-based `rank`.
    pub async fn score_at_rank(&self, rank: u64) -> Result<Option<f64>> {
        Ok(self.store.at_rank(rank).await?.map(|record| record.score))
    }

    /// The allowed record sitting on the visible boundary.
    pub async fn at_review_threshold(&self) -> Result<Option<TrendRecord>> {
        self.store.at_rank(self.review_threshold).await
    }

    /// Flags the owners of unreviewed posts scoring above the boundary.
    ///
    /// Aborts on the first failed account write. A post is only returned once
    /// its account has been marked; each account is written at most once.
    pub async fn request_review(&self, now: DateTime<Utc>) -> Result<Vec<Post>> {
        let boundary = self.score_at_rank(self.review_threshold).await?;

        let mut above: Vec<TrendRecord> = self
            .store
            .all()
            .await?
            .into_iter()
            .filter(|record| boundary.map_or(true, |b| record.score > b))
            .collect();

        if above.is_empty() {
            debug!(?boundary, "No trending posts above review boundary");
            return Ok(Vec::new());
        }

        above.sort_by(by_score);
        let ids: Vec<PostId> = above.iter().map(|r| r.id).collect();
        let mut posts = self.posts.find_by_ids(&ids).await?;
        let order: HashMap<PostId, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        posts.sort_by_key(|post| order.get(&post.id).copied().unwrap_or(usize::MAX));

        let mut flagged_accounts: HashSet<AccountId> = HashSet::new();
        let mut flagged = Vec::new();

        for post in posts {
            if post.is_trendable(self.trendable_by_default)
                || !post.requires_review_notification()
            {
                continue;
            }

            let account_id = post.account_id();
            if !flagged_accounts.contains(&account_id) {
                self.accounts
                    .mark_review_requested(account_id, now)
                    .await
                    .map_err(|e| {
                        error!(
                            account_id,
                            post_id = post.id,
                            error = %e,
                            "Failed to request review, aborting pass"
                        );
                        e
                    })?;
                flagged_accounts.insert(account_id);
            }

            flagged.push(post);
        }

        metrics::record_review_requests(flagged.len() as u64);
        info!(
            ?boundary,
            examined = ids.len(),
            flagged = flagged.len(),
            accounts = flagged_accounts.len(),
            "Trending review pass completed"
        );

        Ok(flagged)
    }
}
