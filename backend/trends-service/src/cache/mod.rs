//! Redis-backed state shared between service instances.

pub mod usage_cache;

pub use usage_cache::RedisUsageTracker;
