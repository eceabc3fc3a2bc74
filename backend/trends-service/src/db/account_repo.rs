use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashSet;
use tracing::debug;

use super::{AccountRepository, ExclusionFilter};
use crate::error::{Result, TrendsError};
use crate::models::AccountId;

#[derive(Clone)]
pub struct PgAccountRepository {
    pool: PgPool,
}

impl PgAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PgAccountRepository {
    async fn mark_review_requested(&self, account_id: AccountId, at: DateTime<Utc>) -> Result<()> {
        let result =
            sqlx::query("UPDATE accounts SET requested_review_at = $2, updated_at = $2 WHERE id = $1")
                .bind(account_id)
                .bind(at)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(TrendsError::NotFound(format!("account {}", account_id)));
        }

        debug!(account_id, "Marked account as review requested");
        Ok(())
    }
}

/// Resolves blocks (both directions), mutes and domain blocks of a viewer.
#[derive(Clone)]
pub struct PgExclusionFilter {
    pool: PgPool,
}

impl PgExclusionFilter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExclusionFilter for PgExclusionFilter {
    async fn excluded_account_ids(
        &self,
        viewer: AccountId,
        candidates: &[AccountId],
    ) -> Result<HashSet<AccountId>> {
        if candidates.is_empty() {
            return Ok(HashSet::new());
        }

        let ids = sqlx::query_scalar::<_, AccountId>(
            r#"
            SELECT a.id
            FROM accounts a
            WHERE a.id = ANY($2)
              AND (
                EXISTS (SELECT 1 FROM blocks b WHERE b.account_id = $1 AND b.target_account_id = a.id)
                OR EXISTS (SELECT 1 FROM blocks b WHERE b.account_id = a.id AND b.target_account_id = $1)
                OR EXISTS (SELECT 1 FROM mutes m WHERE m.account_id = $1 AND m.target_account_id = a.id)
                OR (
                    a.domain IS NOT NULL
                    AND EXISTS (
                        SELECT 1 FROM account_domain_blocks d
                        WHERE d.account_id = $1 AND d.domain = a.domain
                    )
                )
              )
            "#,
        )
        .bind(viewer)
        .bind(candidates)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().collect())
    }
}
