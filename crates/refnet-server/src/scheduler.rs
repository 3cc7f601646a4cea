//! Background job scheduler.
//!
//! Initialises a [`JobScheduler`] at server startup and registers the
//! discovery cache retention job.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive
/// for the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised,
/// a job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(
    pool: PgPool,
    config: Arc<refnet_core::AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_cache_prune_job(&scheduler, pool, config.cache_retention_days).await?;

    scheduler.start().await?;
    Ok(scheduler)
}

/// Register a daily discovery-cache prune.
///
/// Runs every day at 03:00 UTC (`0 0 3 * * *`) and deletes cached candidates
/// older than the retention window. Imported rows survive.
async fn register_cache_prune_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    retention_days: u32,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async("0 0 3 * * *", move |_uuid, _lock| {
        let pool = Arc::clone(&pool);

        Box::pin(async move {
            run_cache_prune(&pool, retention_days, Utc::now()).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

fn prune_cutoff(now: DateTime<Utc>, retention_days: u32) -> DateTime<Utc> {
    now - Duration::days(i64::from(retention_days))
}

async fn run_cache_prune(pool: &PgPool, retention_days: u32, now: DateTime<Utc>) {
    let cutoff = prune_cutoff(now, retention_days);
    tracing::info!(%cutoff, retention_days, "scheduler: pruning discovery cache");

    match refnet_db::prune_discovered_offices(pool, cutoff).await {
        Ok(deleted) => {
            tracing::info!(deleted, "scheduler: discovery cache prune complete");
        }
        Err(e) => {
            tracing::error!(error = %e, "scheduler: discovery cache prune failed");
        }
    }
}
