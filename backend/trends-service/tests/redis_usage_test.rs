//! Integration tests for the Redis usage tracker
//!
//! These tests require a running Redis instance.
//! Run with: cargo test --test redis_usage_test -- --ignored

use chrono::{DateTime, Duration, TimeZone, Utc};
use redis::aio::ConnectionManager;
use std::collections::HashSet;
use trends_service::{cache::RedisUsageTracker, services::UsageTracker, utils::day_start};
use uuid::Uuid;

const REDIS_URL: &str = "redis://127.0.0.1:6379";

async fn connect() -> ConnectionManager {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| REDIS_URL.to_string());
    let client = redis::Client::open(url).expect("Failed to create Redis client");
    ConnectionManager::new(client)
        .await
        .expect("Failed to connect to Redis")
}

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_recently_used_returns_day_bucket() {
    let prefix = format!("trends_test:{}", Uuid::new_v4());
    let tracker = RedisUsageTracker::new(connect().await).with_prefix(prefix.clone());

    tracker.record(1, noon()).await.expect("record");
    tracker.record(2, noon() + Duration::hours(6)).await.expect("record");
    tracker.record(1, noon() + Duration::hours(7)).await.expect("record");
    tracker.record(3, noon() + Duration::days(1)).await.expect("record");

    let today = tracker.recently_used(noon()).await.expect("today");
    assert_eq!(today, HashSet::from([1, 2]));

    let tomorrow = tracker
        .recently_used(noon() + Duration::days(1))
        .await
        .expect("tomorrow");
    assert_eq!(tomorrow, HashSet::from([3]));

    let empty = tracker
        .recently_used(noon() - Duration::days(1))
        .await
        .expect("yesterday");
    assert!(empty.is_empty());

    let mut conn = connect().await;
    let _: () = redis::cmd("DEL")
        .arg(format!("{}:used:{}", prefix, day_start(noon())))
        .arg(format!("{}:used:{}", prefix, day_start(noon() + Duration::days(1))))
        .query_async(&mut conn)
        .await
        .expect("cleanup");
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_bucket_key_gets_one_day_ttl() {
    let prefix = format!("trends_test:{}", Uuid::new_v4());
    let tracker = RedisUsageTracker::new(connect().await).with_prefix(prefix.clone());
    tracker.record(7, noon()).await.expect("record");

    let key = format!("{}:used:{}", prefix, day_start(noon()));
    let mut conn = connect().await;
    let ttl: i64 = redis::cmd("TTL")
        .arg(&key)
        .query_async(&mut conn)
        .await
        .expect("ttl");
    assert!(ttl > 0 && ttl <= 86_400, "unexpected ttl {}", ttl);

    let _: () = redis::cmd("DEL")
        .arg(&key)
        .query_async(&mut conn)
        .await
        .expect("cleanup");
}
