/// Trending Algorithm
///
/// Decayed engagement score for a single post:
///
/// ```text
/// observed = reblogs + favourites
/// raw      = 0                                   if observed < threshold
///          = (observed - expected)^2 / expected  otherwise (expected = 1.0)
/// score    = raw * 0.5 ^ (age / halflife)
/// ```
use chrono::{DateTime, Utc};

use crate::config::TrendingOptions;
use crate::error::Result;
use crate::models::Post;

const EXPECTED: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct TrendingAlgorithm {
    threshold: f64,
    halflife_secs: f64,
}

impl TrendingAlgorithm {
    pub fn new(options: &TrendingOptions) -> Result<Self> {
        options.validate()?;

        Ok(Self {
            threshold: options.threshold as f64,
            halflife_secs: duration_secs(options.score_halflife),
        })
    }

    /// Score before decay. Zero when engagement is under the threshold.
    pub fn raw_score(&self, reblogs_count: i64, favourites_count: i64) -> f64 {
        let observed = (reblogs_count + favourites_count) as f64;

        if EXPECTED > observed || observed < self.threshold {
            0.0
        } else {
            (observed - EXPECTED).powi(2) / EXPECTED
        }
    }

    /// Multiplier halving every `score_halflife` since `created_at`.
    pub fn decay_factor(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let age_secs = duration_secs(now - created_at);
        0.5_f64.powf(age_secs / self.halflife_secs)
    }

    pub fn score(&self, post: &Post, now: DateTime<Utc>) -> f64 {
        self.raw_score(post.reblogs_count, post.favourites_count)
            * self.decay_factor(post.created_at, now)
    }
}

fn duration_secs(duration: chrono::Duration) -> f64 {
    match duration.num_microseconds() {
        Some(micros) => micros as f64 / 1_000_000.0,
        None => duration.num_milliseconds() as f64 / 1_000.0,
    }
}
