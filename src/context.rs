use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::RunConfig;
use crate::definition::JobDefinition;
use crate::ledger::Ledger;

/// Metrics accumulated across one invocation and emitted in the final
/// audit-log record.
#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    pub started_job: u8,
    pub cron_failed: u8,
    pub number_of_objects: Option<usize>,
    pub current_job_seconds_running: Option<i64>,
}

/// Per-invocation state threaded through every pipeline stage.
///
/// Created at the start of a run, discarded after the final audit-log
/// emission. No stage mutates state it does not own: each stage writes only
/// the fields it is responsible for producing.
#[derive(Debug)]
pub struct RunContext {
    pub config: RunConfig,
    pub start_time: DateTime<Utc>,

    /// Working copy of the ledger: reconciled entries plus any entry added by
    /// a submission this run. Persisted wholesale at finalization.
    pub ledger: Ledger,

    /// Set once reconciliation has produced a working ledger. Finalization
    /// only persists after that point; otherwise a run that failed before or
    /// during reconciliation would overwrite the last-known-good document
    /// with an empty one.
    pub ledger_loaded: bool,

    /// Input objects resolved by the caller-supplied lister.
    pub objects: Vec<String>,

    /// Job definition after validation and asset augmentation.
    pub definition: Option<JobDefinition>,

    /// Id assigned by the job service on submission.
    pub job_id: Option<String>,

    pub metrics: RunMetrics,
}

impl RunContext {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            start_time: Utc::now(),
            ledger: Ledger::new(),
            ledger_loaded: false,
            objects: Vec::new(),
            definition: None,
            job_id: None,
            metrics: RunMetrics::default(),
        }
    }
}

/// How an invocation ended, for the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Kill switch or per-job flag stopped the run before it did anything.
    Disabled,
    /// A recognized condition (no inputs, job already running) ended the run
    /// cleanly without a submission.
    Skipped,
    /// A new job was submitted.
    Started,
    /// An unexpected error aborted the run.
    Failed,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Disabled => write!(f, "disabled"),
            RunOutcome::Skipped => write!(f, "skipped"),
            RunOutcome::Started => write!(f, "started"),
            RunOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// The one-per-invocation audit record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub started_job: u8,
    pub cron_failed: u8,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub cron_run_millis: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_objects: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_job_seconds_running: Option<i64>,
    #[serde(skip)]
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn from_context(ctx: &RunContext, outcome: RunOutcome, end_time: DateTime<Utc>) -> Self {
        Self {
            started_job: ctx.metrics.started_job,
            cron_failed: ctx.metrics.cron_failed,
            start_time: ctx.start_time,
            end_time,
            cron_run_millis: (end_time - ctx.start_time).num_milliseconds(),
            number_of_objects: ctx.metrics.number_of_objects,
            current_job_seconds_running: ctx.metrics.current_job_seconds_running,
            outcome,
        }
    }
}
