use crate::{context::AppContext, metrics};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

pub mod tasks;

/// Outcome of the most recent orphan sweeps, read by the health endpoint
///
/// Timestamps are unix milliseconds; 0 means never.
#[derive(Debug, Default)]
pub struct SweepStatus {
    last_success: AtomicI64,
    last_failure: AtomicI64,
}

impl SweepStatus {
    pub fn record_success(&self) {
        self.last_success
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.last_failure
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        from_millis(self.last_success.load(Ordering::Relaxed))
    }

    pub fn last_failure(&self) -> Option<DateTime<Utc>> {
        from_millis(self.last_failure.load(Ordering::Relaxed))
    }

    /// True when the latest sweep failed
    pub fn is_failing(&self) -> bool {
        self.last_failure.load(Ordering::Relaxed) > self.last_success.load(Ordering::Relaxed)
    }
}

fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    if millis == 0 {
        None
    } else {
        DateTime::from_timestamp_millis(millis)
    }
}

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        if self.context.config.cleanup.orphan_sweep_enabled {
            tokio::spawn(Self::orphan_blob_sweep_job(Arc::clone(&self)));
        } else {
            info!("Orphan blob sweep disabled");
        }

        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Remove uploads no tour references (runs on the configured interval)
    async fn orphan_blob_sweep_job(scheduler: Arc<Self>) {
        let cleanup = &scheduler.context.config.cleanup;
        let grace = Duration::from_secs(cleanup.orphan_grace_period_secs);
        let mut interval = interval(Duration::from_secs(cleanup.orphan_sweep_interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            info!("Running orphan blob sweep");

            let start = Instant::now();
            match tasks::sweep_orphaned_blobs(&scheduler.context, grace).await {
                Ok(count) => {
                    scheduler.context.sweep_status.record_success();
                    metrics::record_background_job(
                        "orphan_blob_sweep",
                        "success",
                        start.elapsed().as_secs_f64(),
                    );
                    if count > 0 {
                        info!("Removed {} orphaned blobs", count);
                    } else {
                        info!("Orphan sweep: no orphaned blobs found");
                    }
                }
                Err(e) => {
                    scheduler.context.sweep_status.record_failure();
                    metrics::record_background_job(
                        "orphan_blob_sweep",
                        "failure",
                        start.elapsed().as_secs_f64(),
                    );
                    error!("Failed to sweep orphaned blobs: {}", e);
                }
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300));

        loop {
            interval.tick().await;

            let start = Instant::now();
            match tasks::health_check(&scheduler.context).await {
                Ok(_) => {
                    metrics::record_background_job(
                        "health_check",
                        "success",
                        start.elapsed().as_secs_f64(),
                    );
                }
                Err(e) => {
                    metrics::record_background_job(
                        "health_check",
                        "failure",
                        start.elapsed().as_secs_f64(),
                    );
                    error!("Health check failed: {}", e);
                }
            }
        }
    }
}
