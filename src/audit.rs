//! Ledger reconciliation: turning completed remote jobs into audit records,
//! exactly once per job, with bounded retention.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::future;
use serde::Serialize;

use crate::error::{CronError, Result};
use crate::ledger::Ledger;
use crate::remote::{JobService, JobStatus, ObjectStore};

/// Audit record for one reconciled job. Produced, optionally enriched,
/// logged, then discarded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: String,
    pub job_errors: u64,
    pub time_created: DateTime<Utc>,
    pub job_duration_millis: i64,
}

/// Caller-supplied hook invoked with each completed job before its audit
/// entry is recorded. A hook failure leaves the entry un-audited; it will be
/// reconsidered on the next invocation.
#[async_trait]
pub trait AuditEnricher: Send + Sync {
    async fn enrich(&self, job: &JobStatus, entry: &mut AuditEntry) -> Result<()>;
}

/// Compute the audit entry for a terminal job.
///
/// Fails while the job is still queued or running; classification is
/// deferred to a later cycle.
pub fn classify(job: &JobStatus) -> Result<AuditEntry> {
    if !job.state.is_terminal() {
        return Err(CronError::JobNotComplete(job.id.clone()));
    }
    let time_done = job.time_done.ok_or_else(|| {
        CronError::Validation(format!("job {} is terminal but has no timeDone", job.id))
    })?;
    Ok(AuditEntry {
        id: job.id.clone(),
        job_errors: job.stats.errors,
        time_created: job.time_created,
        job_duration_millis: (time_done - job.time_created).num_milliseconds(),
    })
}

/// Reconciles the persisted ledger against the job service.
pub struct AuditReconciler<'a> {
    jobs: &'a dyn JobService,
    store: &'a dyn ObjectStore,
    enricher: Option<&'a dyn AuditEnricher>,
    ledger_path: String,
    retention: Duration,
}

impl<'a> AuditReconciler<'a> {
    pub fn new(
        jobs: &'a dyn JobService,
        store: &'a dyn ObjectStore,
        enricher: Option<&'a dyn AuditEnricher>,
        ledger_path: String,
        retention: Duration,
    ) -> Self {
        Self {
            jobs,
            store,
            enricher,
            ledger_path,
            retention,
        }
    }

    /// Load the ledger, audit every completed un-audited job, and purge
    /// entries past retention.
    ///
    /// Status fetches fan out fail-fast: one failed fetch aborts the whole
    /// reconciliation and no entries are modified. Classification fans out
    /// per-entry tolerant: one entry's failure leaves it un-audited for the
    /// next cycle without blocking the others.
    ///
    /// Returns the updated in-memory ledger; persistence is the
    /// coordinator's finalization step, not ours.
    pub async fn reconcile(&self, now: DateTime<Utc>) -> Result<Ledger> {
        let mut ledger = match self.store.get_object(&self.ledger_path).await {
            Ok(bytes) => Ledger::parse(&bytes)?,
            Err(CronError::ObjectNotFound(_)) => {
                tracing::debug!(path = %self.ledger_path, "No ledger document yet, starting empty");
                Ledger::new()
            }
            Err(e) => return Err(e),
        };

        let to_audit = ledger.unaudited_ids();
        if !to_audit.is_empty() {
            tracing::info!(count = to_audit.len(), "Auditing previously submitted jobs");

            let statuses =
                future::try_join_all(to_audit.iter().map(|id| self.jobs.job_status(id))).await?;

            let results =
                future::join_all(statuses.iter().map(|job| self.audit_job(job))).await;

            for (job, result) in statuses.iter().zip(results) {
                match result {
                    Ok(()) => {
                        ledger.mark_audited(&job.id);
                    }
                    Err(e) => {
                        tracing::warn!(job_id = %job.id, error = %e, "Audit deferred");
                    }
                }
            }
        }

        let removed = ledger.purge_expired(now, self.retention);
        if removed > 0 {
            tracing::info!(removed, "Purged audited ledger entries past retention");
        }

        Ok(ledger)
    }

    /// Classify one job, run the enrichment hook, and emit the per-job audit
    /// record.
    async fn audit_job(&self, job: &JobStatus) -> Result<()> {
        let mut entry = classify(job)?;

        if let Some(enricher) = self.enricher {
            enricher
                .enrich(job, &mut entry)
                .await
                .map_err(|e| CronError::Hook(e.to_string()))?;
        }

        tracing::info!(
            target: "audit",
            job_id = %entry.id,
            job_errors = entry.job_errors,
            job_duration_millis = entry.job_duration_millis,
            record = %serde_json::to_string(&entry).unwrap_or_default(),
            "Job audited"
        );
        Ok(())
    }
}
