use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trends_service::{
    cache::RedisUsageTracker,
    db::{PgAccountRepository, PgExclusionFilter, PgPostRepository, PgTrendStore, MIGRATOR},
    jobs::run_refresh_loop,
    utils::SystemClock,
    Config, TrendingBackends, TrendingService,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "trends_service=info".into()),
        )
        .with(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_line_number(true)
                .with_target(true),
        )
        .init();

    // Load config
    let config = Config::from_env().context("Failed to load configuration")?;

    info!(
        service = %config.service.service_name,
        threshold = config.trending.threshold,
        review_threshold = config.trending.review_threshold,
        halflife_secs = config.trending.score_halflife.num_seconds(),
        decay_threshold = config.trending.decay_threshold,
        "Starting trends service"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    if config.database.run_migrations {
        MIGRATOR
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
    }

    let redis_client =
        redis::Client::open(config.redis.url.clone()).context("Failed to create Redis client")?;
    let redis = redis::aio::ConnectionManager::new(redis_client)
        .await
        .context("Failed to connect to Redis")?;

    let backends = TrendingBackends {
        usage: Arc::new(RedisUsageTracker::new(redis)),
        store: Arc::new(PgTrendStore::new(pool.clone())),
        posts: Arc::new(PgPostRepository::new(pool.clone())),
        accounts: Arc::new(PgAccountRepository::new(pool.clone())),
        exclusions: Arc::new(PgExclusionFilter::new(pool)),
    };

    let service = Arc::new(
        TrendingService::new(&config.trending, config.service.default_locale.clone(), backends)
            .context("Invalid trending configuration")?,
    );

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

    let job = tokio::spawn(run_refresh_loop(
        service,
        Arc::new(SystemClock),
        config.job.clone(),
        shutdown_rx,
    ));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");
    let _ = shutdown_tx.send(());

    if let Err(e) = job.await {
        error!(error = %e, "Trending refresh task panicked");
    }

    Ok(())
}
