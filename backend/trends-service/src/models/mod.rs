use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type PostId = i64;
pub type AccountId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Unlisted,
    Private,
    Direct,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Unlisted => "unlisted",
            Self::Private => "private",
            Self::Direct => "direct",
        }
    }

    /// Maps the integer column used by the statuses table.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Public),
            1 => Some(Self::Unlisted),
            2 => Some(Self::Private),
            3 => Some(Self::Direct),
            _ => None,
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Owning account of a post, as seen by the trends engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub discoverable: bool,
    pub silenced: bool,
    /// `None` until a moderator has decided whether the account may trend
    pub trendable: Option<bool>,
    pub requested_review_at: Option<DateTime<Utc>>,
}

impl Account {
    pub fn is_trendable(&self, trendable_by_default: bool) -> bool {
        self.trendable.unwrap_or(trendable_by_default)
    }

    pub fn requires_review(&self) -> bool {
        self.trendable.is_none()
    }

    pub fn requested_review(&self) -> bool {
        self.requested_review_at.is_some()
    }

    pub fn requires_review_notification(&self) -> bool {
        self.requires_review() && !self.requested_review()
    }
}

/// A post (status) together with the counters and flags trending needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub account: Account,
    pub reblogs_count: i64,
    pub favourites_count: i64,
    pub created_at: DateTime<Utc>,
    pub language: Option<String>,
    pub visibility: Visibility,
    pub sensitive: bool,
    pub spoiler_text: String,
    pub in_reply_to_id: Option<PostId>,
    /// `None` falls back to the account decision
    pub trendable: Option<bool>,
    /// Set when this post is a reshare of another post
    pub reblog: Option<Box<Post>>,
}

impl Post {
    /// Resolves a reshare to the post it wraps.
    pub fn proper(&self) -> &Post {
        match &self.reblog {
            Some(original) => original.proper(),
            None => self,
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account.id
    }

    pub fn is_reply(&self) -> bool {
        self.in_reply_to_id.is_some()
    }

    pub fn is_trendable(&self, trendable_by_default: bool) -> bool {
        match self.trendable {
            Some(flag) => flag,
            None => self.account.is_trendable(trendable_by_default),
        }
    }

    pub fn requires_review_notification(&self) -> bool {
        self.trendable.is_none() && self.account.requires_review_notification()
    }
}

/// One row of the persisted trending snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendRecord {
    pub id: PostId,
    pub account_id: AccountId,
    pub score: f64,
    pub language: Option<String>,
    pub allowed: bool,
}
