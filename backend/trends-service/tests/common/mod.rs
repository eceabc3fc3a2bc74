#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use trends_service::{
    db::{AccountRepository, ExclusionFilter, InMemoryTrendStore, NoExclusions, PostRepository},
    services::InMemoryUsageTracker,
    Account, AccountId, Post, PostId, Result, TrendingBackends, TrendingOptions,
    TrendingService, TrendsError, Visibility,
};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 10, 0, 0).unwrap()
}

pub fn account(id: AccountId) -> Account {
    Account {
        id,
        discoverable: true,
        silenced: false,
        trendable: Some(true),
        requested_review_at: None,
    }
}

pub fn post(id: PostId, account_id: AccountId, reblogs: i64, favourites: i64) -> Post {
    Post {
        id,
        account: account(account_id),
        reblogs_count: reblogs,
        favourites_count: favourites,
        created_at: t0(),
        language: Some("en".to_string()),
        visibility: Visibility::Public,
        sensitive: false,
        spoiler_text: String::new(),
        in_reply_to_id: None,
        trendable: None,
        reblog: None,
    }
}

/// Post repository over a mutable map, standing in for the statuses table.
#[derive(Default)]
pub struct InMemoryPosts {
    posts: Mutex<HashMap<PostId, Post>>,
    fail: Mutex<bool>,
}

impl InMemoryPosts {
    pub fn insert(&self, post: Post) {
        self.posts.lock().unwrap().insert(post.id, post);
    }

    pub fn delete(&self, id: PostId) {
        self.posts.lock().unwrap().remove(&id);
    }

    pub fn update(&self, id: PostId, f: impl FnOnce(&mut Post)) {
        if let Some(post) = self.posts.lock().unwrap().get_mut(&id) {
            f(post);
        }
    }

    pub fn set_failing(&self, failing: bool) {
        *self.fail.lock().unwrap() = failing;
    }
}

#[async_trait]
impl PostRepository for InMemoryPosts {
    async fn find_by_ids(&self, ids: &[PostId]) -> Result<Vec<Post>> {
        if *self.fail.lock().unwrap() {
            return Err(TrendsError::Database("statuses unavailable".to_string()));
        }
        let posts = self.posts.lock().unwrap();
        Ok(ids.iter().filter_map(|id| posts.get(id).cloned()).collect())
    }
}

/// Records every review request it receives.
#[derive(Default)]
pub struct RecordingAccounts {
    pub requested: Mutex<Vec<(AccountId, DateTime<Utc>)>>,
}

impl RecordingAccounts {
    pub fn requested_ids(&self) -> Vec<AccountId> {
        self.requested.lock().unwrap().iter().map(|(id, _)| *id).collect()
    }
}

#[async_trait]
impl AccountRepository for RecordingAccounts {
    async fn mark_review_requested(&self, account_id: AccountId, at: DateTime<Utc>) -> Result<()> {
        self.requested.lock().unwrap().push((account_id, at));
        Ok(())
    }
}

/// Viewer -> accounts hidden from that viewer.
#[derive(Default)]
pub struct StaticExclusions {
    pub hidden: HashMap<AccountId, HashSet<AccountId>>,
}

#[async_trait]
impl ExclusionFilter for StaticExclusions {
    async fn excluded_account_ids(
        &self,
        viewer: AccountId,
        candidates: &[AccountId],
    ) -> Result<HashSet<AccountId>> {
        let hidden = self.hidden.get(&viewer).cloned().unwrap_or_default();
        Ok(candidates
            .iter()
            .copied()
            .filter(|id| hidden.contains(id))
            .collect())
    }
}

pub struct Harness {
    pub service: TrendingService,
    pub usage: Arc<InMemoryUsageTracker>,
    pub store: Arc<InMemoryTrendStore>,
    pub posts: Arc<InMemoryPosts>,
    pub accounts: Arc<RecordingAccounts>,
}

pub fn harness(options: TrendingOptions) -> Harness {
    harness_with_exclusions(options, NoExclusions)
}

pub fn harness_with_exclusions(
    options: TrendingOptions,
    exclusions: impl ExclusionFilter + 'static,
) -> Harness {
    let usage = Arc::new(InMemoryUsageTracker::new());
    let store = Arc::new(InMemoryTrendStore::new());
    let posts = Arc::new(InMemoryPosts::default());
    let accounts = Arc::new(RecordingAccounts::default());

    let service = TrendingService::new(
        &options,
        "en",
        TrendingBackends {
            usage: usage.clone(),
            store: store.clone(),
            posts: posts.clone(),
            accounts: accounts.clone(),
            exclusions: Arc::new(exclusions),
        },
    )
    .expect("valid options");

    Harness {
        service,
        usage,
        store,
        posts,
        accounts,
    }
}
