use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;

use super::PostRepository;
use crate::error::Result;
use crate::models::{Account, AccountId, Post, PostId, Visibility};

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: PostId,
    account_id: AccountId,
    created_at: DateTime<Utc>,
    language: Option<String>,
    visibility: i32,
    sensitive: bool,
    spoiler_text: String,
    in_reply_to_id: Option<PostId>,
    trendable: Option<bool>,
    reblogs_count: i64,
    favourites_count: i64,
    discoverable: bool,
    silenced: bool,
    account_trendable: Option<bool>,
    requested_review_at: Option<DateTime<Utc>>,
}

impl PostRow {
    fn into_post(self) -> Option<Post> {
        let Some(visibility) = Visibility::from_code(self.visibility) else {
            warn!(
                post_id = self.id,
                visibility = self.visibility,
                "Unknown visibility, skipping post"
            );
            return None;
        };

        Some(Post {
            id: self.id,
            account: Account {
                id: self.account_id,
                discoverable: self.discoverable,
                silenced: self.silenced,
                trendable: self.account_trendable,
                requested_review_at: self.requested_review_at,
            },
            reblogs_count: self.reblogs_count,
            favourites_count: self.favourites_count,
            created_at: self.created_at,
            language: self.language,
            visibility,
            sensitive: self.sensitive,
            spoiler_text: self.spoiler_text,
            in_reply_to_id: self.in_reply_to_id,
            trendable: self.trendable,
            reblog: None,
        })
    }
}

/// Reads posts, their stats and owning accounts from the platform schema.
#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn find_by_ids(&self, ids: &[PostId]) -> Result<Vec<Post>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT
                s.id,
                s.account_id,
                s.created_at,
                s.language,
                s.visibility,
                s.sensitive,
                COALESCE(s.spoiler_text, '') AS spoiler_text,
                s.in_reply_to_id,
                s.trendable,
                COALESCE(ss.reblogs_count, 0)::bigint AS reblogs_count,
                COALESCE(ss.favourites_count, 0)::bigint AS favourites_count,
                COALESCE(a.discoverable, FALSE) AS discoverable,
                (a.silenced_at IS NOT NULL) AS silenced,
                a.trendable AS account_trendable,
                a.requested_review_at
            FROM statuses s
            JOIN accounts a ON a.id = s.account_id
            LEFT JOIN status_stats ss ON ss.status_id = s.id
            WHERE s.id = ANY($1)
              AND s.deleted_at IS NULL
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().filter_map(PostRow::into_post).collect())
    }
}
