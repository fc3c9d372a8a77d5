//! Job submission: create, attach inputs, seal, record in the ledger.

use chrono::Utc;

use crate::context::RunContext;
use crate::error::{CronError, Result};
use crate::ledger::JobRecord;
use crate::remote::JobService;

/// Submit the context's validated definition and attach its input objects,
/// sealing the input stream.
///
/// On success a fresh un-audited ledger entry is recorded in the context's
/// working ledger. Any failure is fatal; retry is the transport's concern.
pub async fn submit(jobs: &dyn JobService, ctx: &mut RunContext) -> Result<String> {
    let definition = ctx
        .definition
        .as_ref()
        .ok_or_else(|| CronError::Validation("no job definition resolved".to_string()))?;

    let job_id = jobs.create_job(definition).await?;
    jobs.attach_inputs(&job_id, &ctx.objects, true).await?;

    ctx.ledger.insert(job_id.clone(), JobRecord::new(Utc::now()));
    ctx.metrics.started_job = 1;
    ctx.job_id = Some(job_id.clone());

    tracing::info!(
        job_id = %job_id,
        objects = ctx.objects.len(),
        "Submitted job with sealed input"
    );
    Ok(job_id)
}
