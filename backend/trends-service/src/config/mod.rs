use chrono::Duration;
use std::env;
use std::str::FromStr;

use crate::error::{Result, TrendsError};

#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub trending: TrendingOptions,
    pub job: RefreshJobConfig,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub service_name: String,
    /// Platform default locale, the middle tier of locale-preferring queries
    pub default_locale: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// Scoring and gating parameters, fixed for the lifetime of a service.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendingOptions {
    /// Minimum observed engagement (reblogs + favourites) for a non-zero score
    pub threshold: i64,
    /// Rank among allowed records above which unreviewed posts are escalated
    pub review_threshold: u64,
    pub score_halflife: Duration,
    /// Records scoring below this are pruned on refresh
    pub decay_threshold: f64,
    /// Trendable decision applied to posts whose account was never reviewed
    pub trendable_by_default: bool,
}

impl Default for TrendingOptions {
    fn default() -> Self {
        Self {
            threshold: 5,
            review_threshold: 3,
            score_halflife: Duration::hours(2),
            decay_threshold: 0.3,
            trendable_by_default: false,
        }
    }
}

impl TrendingOptions {
    pub fn validate(&self) -> Result<()> {
        if self.threshold < 0 {
            return Err(TrendsError::Configuration(format!(
                "threshold must be >= 0, got {}",
                self.threshold
            )));
        }
        if self.review_threshold == 0 {
            return Err(TrendsError::Configuration(
                "review_threshold must be >= 1".to_string(),
            ));
        }
        if self.score_halflife <= Duration::zero() {
            return Err(TrendsError::Configuration(format!(
                "score_halflife must be positive, got {}s",
                self.score_halflife.num_seconds()
            )));
        }
        if !self.decay_threshold.is_finite() || self.decay_threshold < 0.0 {
            return Err(TrendsError::Configuration(format!(
                "decay_threshold must be a finite value >= 0, got {}",
                self.decay_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RefreshJobConfig {
    pub interval_secs: u64,
    /// Run the review gate after every successful refresh
    pub request_review: bool,
}

impl Default for RefreshJobConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            request_review: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = TrendingOptions::default();
        let trending = TrendingOptions {
            threshold: parse_var("TRENDS_THRESHOLD", defaults.threshold)?,
            review_threshold: parse_var("TRENDS_REVIEW_THRESHOLD", defaults.review_threshold)?,
            score_halflife: Duration::seconds(parse_var(
                "TRENDS_SCORE_HALFLIFE_SECS",
                defaults.score_halflife.num_seconds(),
            )?),
            decay_threshold: parse_var("TRENDS_DECAY_THRESHOLD", defaults.decay_threshold)?,
            trendable_by_default: parse_var(
                "TRENDS_TRENDABLE_BY_DEFAULT",
                defaults.trendable_by_default,
            )?,
        };
        trending.validate()?;

        Ok(Config {
            service: ServiceConfig {
                service_name: env::var("SERVICE_NAME")
                    .unwrap_or_else(|_| "trends-service".to_string()),
                default_locale: env::var("DEFAULT_LOCALE").unwrap_or_else(|_| "en".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgres://localhost/nova".to_string()),
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 10)?,
                run_migrations: parse_var("RUN_MIGRATIONS", true)?,
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            },
            trending,
            job: RefreshJobConfig {
                interval_secs: parse_var("TRENDS_REFRESH_INTERVAL_SECS", 300)?,
                request_review: parse_var("TRENDS_REQUEST_REVIEW", true)?,
            },
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| {
            TrendsError::Configuration(format!("{} has an invalid value {:?}: {}", name, raw, e))
        }),
        Err(_) => Ok(default),
    }
}
