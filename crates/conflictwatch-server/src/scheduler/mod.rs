//! Background job scheduler.
//!
//! Registers the monitoring cycle as a fixed-interval job on a
//! [`JobScheduler`]. The job itself only calls [`Monitor::tick`]; overlap
//! prevention and stop semantics live in the monitor.

mod monitor;

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

pub use monitor::{Monitor, MonitorSettings, MonitorState};

/// Builds and starts the background job scheduler.
///
/// The returned [`JobScheduler`] must be kept alive for the lifetime of the
/// process; dropping it shuts down the monitoring job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, the
/// job cannot be registered, or the scheduler fails to start.
pub async fn build_scheduler(monitor: Arc<Monitor>) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_monitor_job(&scheduler, monitor).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Register the repeating monitoring job at the monitor's configured interval.
async fn register_monitor_job(
    scheduler: &JobScheduler,
    monitor: Arc<Monitor>,
) -> Result<(), JobSchedulerError> {
    let interval = monitor.interval();

    let job = Job::new_repeated_async(interval, move |_uuid, _lock| {
        let monitor = Arc::clone(&monitor);

        Box::pin(async move {
            monitor.tick().await;
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(
        interval_secs = interval.as_secs(),
        "scheduler: monitoring job registered"
    );
    Ok(())
}

/// Stop the monitor, then the scheduler.
///
/// Stopping the monitor first guarantees no cycle starts while the scheduler
/// winds down.
pub async fn shutdown(monitor: &Monitor, mut scheduler: JobScheduler) {
    monitor.stop();
    if let Err(e) = scheduler.shutdown().await {
        tracing::warn!(error = %e, "scheduler: shutdown failed");
    }
}
