//! Conflict detection for in-flight jobs sharing the configured name.

use chrono::{DateTime, Utc};
use futures::future;

use crate::error::{CronError, Result};
use crate::remote::{JobService, JobStatus};

/// All live (non-terminal) jobs with the given name, with full status.
///
/// Status fetches fan out fail-fast; a single failed fetch fails the lookup.
pub async fn find_active(jobs: &dyn JobService, name: &str) -> Result<Vec<JobStatus>> {
    let briefs = jobs.list_jobs(name).await?;
    let statuses =
        future::try_join_all(briefs.iter().map(|brief| jobs.job_status(&brief.id))).await?;
    Ok(statuses
        .into_iter()
        .filter(|status| !status.state.is_terminal())
        .collect())
}

/// Decide whether a new job may be submitted.
///
/// - No live job: proceed.
/// - One live job whose input is not yet sealed: it was superseded by this
///   run; cancel it and proceed.
/// - One live job with sealed input: it is genuinely running; stop cleanly
///   with the elapsed running time.
/// - More than one live job: the at-most-one-per-name invariant has been
///   violated outside our control; fail without remediation.
pub async fn resolve(jobs: &dyn JobService, name: &str, now: DateTime<Utc>) -> Result<()> {
    let mut live = find_active(jobs, name).await?;
    match live.len() {
        0 => Ok(()),
        1 => {
            let job = live.remove(0);
            if job.input_done {
                let seconds_running = (now - job.time_created).num_seconds();
                tracing::info!(
                    job_id = %job.id,
                    seconds_running,
                    "Previous job still running, skipping this run"
                );
                Err(CronError::AlreadyRunning { seconds_running })
            } else {
                tracing::info!(job_id = %job.id, "Canceling superseded job with unsealed input");
                jobs.cancel_job(&job.id).await?;
                Ok(())
            }
        }
        count => Err(CronError::NameCollision {
            name: name.to_string(),
            count,
        }),
    }
}
