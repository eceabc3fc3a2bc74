/// Trending Repository
///
/// PostgreSQL-backed trend store over the `trending_statuses` table.
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, error};

use super::{BatchOutcome, TrendBatch, TrendStore};
use crate::error::Result;
use crate::models::{AccountId, PostId, TrendRecord};
use crate::services::trending::query::RankedView;

/// Advisory lock held by every `apply` transaction.
pub const APPLY_LOCK_KEY: i64 = 0x7472_656e_6473;

#[derive(Debug, sqlx::FromRow)]
struct TrendRow {
    id: PostId,
    account_id: AccountId,
    score: f64,
    language: Option<String>,
    allowed: bool,
}

impl From<TrendRow> for TrendRecord {
    fn from(row: TrendRow) -> Self {
        Self {
            id: row.id,
            account_id: row.account_id,
            score: row.score,
            language: row.language,
            allowed: row.allowed,
        }
    }
}

#[derive(Clone)]
pub struct PgTrendStore {
    pool: PgPool,
}

impl PgTrendStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrendStore for PgTrendStore {
    async fn tracked_ids(&self) -> Result<Vec<PostId>> {
        let ids = sqlx::query_scalar::<_, PostId>("SELECT id FROM trending_statuses")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn apply(&self, batch: TrendBatch) -> Result<BatchOutcome> {
        let mut ids = Vec::with_capacity(batch.records.len());
        let mut account_ids = Vec::with_capacity(batch.records.len());
        let mut scores = Vec::with_capacity(batch.records.len());
        let mut languages = Vec::with_capacity(batch.records.len());
        let mut allowed = Vec::with_capacity(batch.records.len());

        for record in batch.records {
            ids.push(record.id);
            account_ids.push(record.account_id);
            scores.push(record.score);
            languages.push(record.language);
            allowed.push(record.allowed);
        }

        let mut tx = self.pool.begin().await?;

        // Replicas refreshing at the same time apply one after the other
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(APPLY_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let removed = if batch.removed.is_empty() {
            0
        } else {
            sqlx::query("DELETE FROM trending_statuses WHERE id = ANY($1)")
                .bind(&batch.removed)
                .execute(&mut *tx)
                .await?
                .rows_affected()
        };

        let upserted = if ids.is_empty() {
            0
        } else {
            sqlx::query(
                r#"
                INSERT INTO trending_statuses (id, account_id, score, language, allowed)
                SELECT * FROM UNNEST($1::bigint[], $2::bigint[], $3::float8[], $4::text[], $5::bool[])
                ON CONFLICT (id) DO UPDATE SET
                    account_id = EXCLUDED.account_id,
                    score = EXCLUDED.score,
                    language = EXCLUDED.language,
                    allowed = EXCLUDED.allowed,
                    updated_at = NOW()
                "#,
            )
            .bind(&ids)
            .bind(&account_ids)
            .bind(&scores)
            .bind(&languages)
            .bind(&allowed)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(records = ids.len(), error = %e, "Failed to upsert trending statuses");
                e
            })?
            .rows_affected()
        };

        let pruned = sqlx::query("DELETE FROM trending_statuses WHERE score < $1")
            .bind(batch.decay_threshold)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        debug!(upserted, removed, pruned, "Applied trending batch");

        Ok(BatchOutcome {
            upserted,
            removed,
            pruned,
        })
    }

    async fn find(&self, id: PostId) -> Result<Option<TrendRecord>> {
        let row = sqlx::query_as::<_, TrendRow>(
            "SELECT id, account_id, score, language, allowed FROM trending_statuses WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn all(&self) -> Result<Vec<TrendRecord>> {
        let rows = sqlx::query_as::<_, TrendRow>(
            "SELECT id, account_id, score, language, allowed FROM trending_statuses",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn ordered(&self, view: &RankedView) -> Result<Vec<TrendRecord>> {
        // NULL locales put every row in tier 0, leaving score order; NULL LIMIT is no limit
        let (locale, default_locale) = match &view.locale {
            Some(pref) => (Some(pref.locale.as_str()), Some(pref.default_locale.as_str())),
            None => (None, None),
        };

        let rows = sqlx::query_as::<_, TrendRow>(
            r#"
            SELECT id, account_id, score, language, allowed
            FROM trending_statuses
            WHERE ($1 = FALSE OR allowed = TRUE)
            ORDER BY
                CASE
                    WHEN language = $2 THEN 2
                    WHEN language = $3 THEN 1
                    ELSE 0
                END DESC,
                score DESC,
                id ASC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(view.allowed_only)
        .bind(locale)
        .bind(default_locale)
        .bind(view.limit.map(|limit| limit as i64))
        .bind(view.offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn rank_of(&self, id: PostId) -> Result<Option<u64>> {
        let rank = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT s.rank FROM (
                SELECT id, ROW_NUMBER() OVER (ORDER BY score DESC, id ASC) AS rank
                FROM trending_statuses
                WHERE allowed = TRUE
            ) s
            WHERE s.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rank.map(|r| r as u64))
    }

    async fn at_rank(&self, rank: u64) -> Result<Option<TrendRecord>> {
        let row = sqlx::query_as::<_, TrendRow>(
            r#"
            SELECT s.id, s.account_id, s.score, s.language, s.allowed FROM (
                SELECT id, account_id, score, language, allowed,
                       ROW_NUMBER() OVER (ORDER BY score DESC, id ASC) AS rank
                FROM trending_statuses
                WHERE allowed = TRUE
            ) s
            WHERE s.rank = $1
            "#,
        )
        .bind(rank as i64)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn ids_by_allowed(&self, allowed: bool, limit: usize) -> Result<Vec<PostId>> {
        let ids = sqlx::query_scalar::<_, PostId>(
            "SELECT id FROM trending_statuses WHERE allowed = $1 LIMIT $2",
        )
        .bind(allowed)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}
