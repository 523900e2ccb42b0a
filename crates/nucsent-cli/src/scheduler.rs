//! Recurring ingestion.
//!
//! One cron job brings every enabled source up to date. The freshness check
//! inside the pipeline decides whether a tick actually fetches.

use std::sync::Arc;

use nucsent_sentiment::{FetchOutcome, Pipeline};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Builds and starts the scheduler with the ingestion job registered.
///
/// The returned [`JobScheduler`] must be kept alive; dropping it stops the
/// job.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if `cron` is not a valid six-field
/// expression or the scheduler fails to start.
pub(crate) async fn build_scheduler(
    pipeline: Arc<Pipeline>,
    cron: &str,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    scheduler.add(ingest_job(pipeline, cron)?).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

pub(crate) fn ingest_job(pipeline: Arc<Pipeline>, cron: &str) -> Result<Job, JobSchedulerError> {
    Job::new_async(cron, move |_uuid, _lock| {
        let pipeline = Arc::clone(&pipeline);
        Box::pin(async move {
            tracing::info!("scheduler: starting ingestion pass");
            run_pass(&pipeline).await;
            tracing::info!("scheduler: ingestion pass complete");
        })
    })
}

/// Run every enabled source once without forcing a fetch.
pub(crate) async fn run_pass(pipeline: &Pipeline) {
    for (source, result) in pipeline.run_enabled(false).await {
        let Ok(report) = result else {
            // run_enabled already logged the error
            continue;
        };
        match &report.fetch {
            FetchOutcome::Failed { error, .. } => {
                tracing::warn!(source = %source, error = %error, "scheduler: fetch failed");
            }
            FetchOutcome::Skipped { .. } | FetchOutcome::Completed { .. } => {
                tracing::info!(
                    source = %source,
                    units = report.extraction.units,
                    labeled = report.labeling.labeled,
                    "scheduler: source up to date"
                );
            }
        }
    }
}

/// Resolves on ctrl-c or, on unix, SIGTERM.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, stopping scheduler");
}
