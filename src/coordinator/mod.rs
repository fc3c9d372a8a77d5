//! The run-lifecycle coordinator: one ordered stage pipeline per invocation.

pub mod assets;
pub mod resolver;
pub mod submit;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::audit::{AuditEnricher, AuditReconciler};
use crate::config::RunConfig;
use crate::context::{RunContext, RunOutcome, RunReport};
use crate::definition::JobDefinition;
use crate::error::{CronError, Result};
use crate::remote::{JobService, ObjectStore, PutOptions};

/// Caller-supplied lookup for the run's input objects.
#[async_trait]
pub trait InputLister: Send + Sync {
    async fn list_input_objects(&self, ctx: &RunContext) -> Result<Vec<String>>;
}

/// Caller-supplied source of the job definition.
#[async_trait]
pub trait DefinitionProvider: Send + Sync {
    async fn provide(&self, ctx: &RunContext) -> Result<JobDefinition>;
}

type CompletionObserver = Box<dyn Fn(&RunReport) + Send + Sync>;

/// Drives one cron invocation end to end.
///
/// Stages run strictly sequentially over a single [`RunContext`]. A stage
/// either continues the pipeline, stops it cleanly (a recognized condition
/// such as the job being disabled), or fails it. Whatever happens, the
/// coordinator finalizes by persisting the ledger, emitting one audit-log
/// record, and notifying completion observers; finalization errors never
/// replace the stage outcome.
pub struct RunCoordinator {
    config: RunConfig,
    jobs: Arc<dyn JobService>,
    store: Arc<dyn ObjectStore>,
    lister: Arc<dyn InputLister>,
    provider: Arc<dyn DefinitionProvider>,
    enricher: Option<Arc<dyn AuditEnricher>>,
    observers: Vec<CompletionObserver>,
}

impl RunCoordinator {
    pub fn new(
        config: RunConfig,
        jobs: Arc<dyn JobService>,
        store: Arc<dyn ObjectStore>,
        lister: Arc<dyn InputLister>,
        provider: Arc<dyn DefinitionProvider>,
    ) -> Self {
        Self {
            config,
            jobs,
            store,
            lister,
            provider,
            enricher: None,
            observers: Vec::new(),
        }
    }

    pub fn with_enricher(mut self, enricher: Arc<dyn AuditEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Register a callback invoked with the final report of every run, after
    /// the audit-log record has been emitted.
    pub fn on_complete(&mut self, observer: impl Fn(&RunReport) + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Execute one full invocation.
    ///
    /// Returns `Ok` with the run report for successful runs and for the
    /// recognized clean stops (disabled, no inputs, already running); fatal
    /// stage errors are returned unchanged after finalization.
    pub async fn run(&self) -> Result<RunReport> {
        let mut ctx = RunContext::new(self.config.clone());
        tracing::info!(job = %self.config.job_name, "Cron run starting");
        let outcome = self.execute_stages(&mut ctx).await;
        self.finalize(ctx, outcome).await
    }

    async fn execute_stages(&self, ctx: &mut RunContext) -> Result<()> {
        // Stage 1: disable switches.
        if !ctx.config.run_allowed() {
            return Err(CronError::JobDisabled);
        }
        if ctx.config.force_run && (!ctx.config.enabled || ctx.config.disable_all) {
            tracing::warn!("Force-run override set, proceeding despite disable switches");
        }

        // Stage 2: reconcile the prior ledger.
        let reconciler = AuditReconciler::new(
            self.jobs.as_ref(),
            self.store.as_ref(),
            self.enricher.as_deref(),
            ctx.config.ledger_path(),
            ctx.config.retention(),
        );
        ctx.ledger = reconciler.reconcile(Utc::now()).await?;
        ctx.ledger_loaded = true;

        // Stage 3: resolve conflicting in-flight jobs.
        if let Err(e) = resolver::resolve(self.jobs.as_ref(), &ctx.config.job_name, Utc::now()).await
        {
            if let CronError::AlreadyRunning { seconds_running } = &e {
                ctx.metrics.current_job_seconds_running = Some(*seconds_running);
            }
            return Err(e);
        }

        // Stages 4 and 5: directories, then the asset bundle.
        assets::setup_directories(self.store.as_ref(), &ctx.config).await?;
        assets::publish_asset(self.store.as_ref(), &ctx.config).await?;

        // Stage 6: resolve input objects.
        let objects = self.lister.list_input_objects(ctx).await?;
        if objects.is_empty() {
            return Err(CronError::NoInputObjects);
        }
        ctx.metrics.number_of_objects = Some(objects.len());
        ctx.objects = objects;

        // Stage 7: resolve and validate the job definition.
        let mut definition = self.provider.provide(ctx).await?;
        definition.validate_and_augment(&ctx.config.job_name, ctx.config.asset_object.as_deref())?;
        ctx.definition = Some(definition);

        // Stage 8: submit.
        submit::submit(self.jobs.as_ref(), ctx).await?;
        Ok(())
    }

    /// Always runs, whatever the stage outcome: persist the ledger, emit the
    /// per-invocation audit record, notify observers, and hand back the
    /// original outcome.
    async fn finalize(&self, mut ctx: RunContext, outcome: Result<()>) -> Result<RunReport> {
        if ctx.ledger_loaded {
            let ledger_path = ctx.config.ledger_path();
            match self
                .store
                .put_object(&ledger_path, ctx.ledger.encode(), PutOptions::default())
                .await
            {
                Ok(()) => {}
                Err(CronError::ObjectNotFound(path)) => {
                    tracing::warn!(path = %path, "Ledger destination missing, skipping persistence");
                }
                Err(e) => {
                    tracing::error!(error = %e, path = %ledger_path, "Failed to persist ledger");
                }
            }
        }

        let (run_outcome, stage_error) = match outcome {
            Ok(()) => (RunOutcome::Started, None),
            Err(e) if e.is_clean_stop() => {
                tracing::info!(reason = %e, "Cron run ended cleanly");
                let run_outcome = if matches!(e, CronError::JobDisabled) {
                    RunOutcome::Disabled
                } else {
                    RunOutcome::Skipped
                };
                (run_outcome, None)
            }
            Err(e) => {
                tracing::error!(error = %e, "Cron run failed");
                ctx.metrics.cron_failed = 1;
                (RunOutcome::Failed, Some(e))
            }
        };

        let report = RunReport::from_context(&ctx, run_outcome, Utc::now());
        tracing::info!(
            target: "audit",
            outcome = %run_outcome,
            record = %serde_json::to_string(&report).unwrap_or_default(),
            "Cron run complete"
        );

        for observer in &self.observers {
            observer(&report);
        }

        match stage_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}
