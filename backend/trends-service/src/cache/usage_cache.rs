use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashSet;
use tracing::error;

use crate::error::Result;
use crate::models::PostId;
use crate::services::trending::usage::{UsageTracker, BUCKET_SECS};
use crate::utils::day_start;

pub const KEY_PREFIX: &str = "trending_statuses";

/// Usage tracker shared across instances through Redis sets.
///
/// Key: `trending_statuses:used:{day_start_unix}`, expiring one day after the
/// last write.
#[derive(Clone)]
pub struct RedisUsageTracker {
    redis: ConnectionManager,
    key_prefix: String,
}

impl RedisUsageTracker {
    pub fn new(redis: ConnectionManager) -> Self {
        Self {
            redis,
            key_prefix: KEY_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(mut self, key_prefix: impl Into<String>) -> Self {
        self.key_prefix = key_prefix.into();
        self
    }

    fn used_key(&self, at: DateTime<Utc>) -> String {
        used_key(&self.key_prefix, at)
    }
}

fn used_key(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}:used:{}", prefix, day_start(at))
}

#[async_trait]
impl UsageTracker for RedisUsageTracker {
    async fn record(&self, post_id: PostId, at: DateTime<Utc>) -> Result<()> {
        let key = self.used_key(at);
        let mut conn = self.redis.clone();

        conn.sadd::<_, _, ()>(&key, post_id).await.map_err(|e| {
            error!(redis_key = %key, error = %e, "Failed to record post usage");
            e
        })?;
        conn.expire::<_, ()>(&key, BUCKET_SECS).await?;

        Ok(())
    }

    async fn recently_used(&self, at: DateTime<Utc>) -> Result<HashSet<PostId>> {
        let key = self.used_key(at);
        let mut conn = self.redis.clone();

        let ids: HashSet<PostId> = conn.smembers(&key).await?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_used_key_is_day_bucketed() {
        let morning = Utc.with_ymd_and_hms(2024, 6, 10, 1, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 6, 10, 23, 0, 0).unwrap();
        let midnight = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap();

        assert_eq!(used_key(KEY_PREFIX, morning), used_key(KEY_PREFIX, evening));
        assert_eq!(
            used_key(KEY_PREFIX, morning),
            format!("trending_statuses:used:{}", midnight.timestamp())
        );
    }
}
