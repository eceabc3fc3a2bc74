//! Background jobs
//!
//! Periodic trending refresh followed by the review pass.
//!
//! - Fixed interval via `tokio::time::interval`
//! - Failures are logged and retried on the next tick, with exponential
//!   backoff after repeated failures
//! - Stops on the broadcast shutdown signal

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::RefreshJobConfig;
use crate::error::Result;
use crate::metrics;
use crate::services::TrendingService;
use crate::utils::Clock;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub tracked: u64,
    pub flagged: usize,
}

/// One refresh (+ optional review) cycle at the clock's current time.
pub async fn run_cycle(
    service: &TrendingService,
    clock: &dyn Clock,
    config: &RefreshJobConfig,
    correlation_id: &str,
) -> Result<CycleReport> {
    let start = Instant::now();
    let now = clock.now();

    let summary = match service.refresh(now).await {
        Ok(summary) => {
            metrics::record_refresh_run("success");
            metrics::record_refresh_duration(start.elapsed());
            summary
        }
        Err(e) => {
            metrics::record_refresh_run("error");
            metrics::record_refresh_duration(start.elapsed());
            return Err(e);
        }
    };

    let flagged = if config.request_review {
        let posts = service.request_review(now).await?;
        for post in &posts {
            info!(
                correlation_id = %correlation_id,
                post_id = post.id,
                account_id = post.account_id(),
                "Trending post requires review"
            );
        }
        posts.len()
    } else {
        0
    };

    Ok(CycleReport {
        tracked: summary.tracked(),
        flagged,
    })
}

/// Runs `run_cycle` on a fixed interval until shutdown.
pub async fn run_refresh_loop(
    service: Arc<TrendingService>,
    clock: Arc<dyn Clock>,
    config: RefreshJobConfig,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut interval_timer = interval(Duration::from_secs(config.interval_secs.max(1)));
    let mut consecutive_failures = 0u32;

    info!(
        interval_sec = config.interval_secs,
        request_review = config.request_review,
        "Starting trending refresh loop"
    );

    loop {
        tokio::select! {
            _ = interval_timer.tick() => {
                let correlation_id = Uuid::new_v4().to_string();

                match run_cycle(&service, clock.as_ref(), &config, &correlation_id).await {
                    Ok(report) => {
                        if consecutive_failures > 0 {
                            info!(
                                correlation_id = %correlation_id,
                                recovered_after = consecutive_failures,
                                "Trending refresh recovered after failures"
                            );
                            consecutive_failures = 0;
                        }
                        info!(
                            correlation_id = %correlation_id,
                            tracked = report.tracked,
                            flagged = report.flagged,
                            "Trending cycle completed"
                        );
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        error!(
                            correlation_id = %correlation_id,
                            error = %e,
                            consecutive_failures,
                            "Trending cycle failed, will retry on next interval"
                        );

                        if consecutive_failures >= 3 {
                            let backoff_secs = backoff_secs(consecutive_failures);
                            warn!(backoff_secs, "Backing off after consecutive failures");
                            tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        }
                    }
                }
            }
            _ = shutdown.recv() => {
                info!("Received shutdown signal, stopping trending refresh loop");
                break;
            }
        }
    }

    info!("Trending refresh loop stopped");
}

fn backoff_secs(consecutive_failures: u32) -> u64 {
    2u64.pow(consecutive_failures.min(5))
}
