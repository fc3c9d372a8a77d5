use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use jobcron::config::RunConfig;
use jobcron::context::RunContext;
use jobcron::coordinator::{DefinitionProvider, InputLister, RunCoordinator};
use jobcron::definition::JobDefinition;
use jobcron::error::{CronError, Result};
use jobcron::remote::{HttpJobService, HttpObjectStore};

#[derive(Parser, Debug)]
#[command(name = "jobcron")]
#[command(version)]
#[command(about = "Launch a named long-running compute job and audit prior runs")]
struct Args {
    /// Job name. At most one live job with this name may exist.
    #[arg(long)]
    name: String,

    /// Object-store root directory for this job
    #[arg(long)]
    job_root: String,

    /// Base URL of the compute-job service
    #[arg(long)]
    job_service_url: String,

    /// Base URL of the object store
    #[arg(long)]
    object_store_url: String,

    /// Local JSON file holding the job definition
    #[arg(long)]
    definition_file: PathBuf,

    /// Local file listing input object paths, one per line
    #[arg(long)]
    inputs_file: PathBuf,

    /// Local asset bundle to publish before each run
    #[arg(long, requires = "asset_object")]
    asset_file: Option<PathBuf>,

    /// Object-store destination for the asset bundle
    #[arg(long, requires = "asset_file")]
    asset_object: Option<String>,

    /// Disable this job (the run ends cleanly without submitting)
    #[arg(long)]
    disabled: bool,

    /// Global kill switch covering every managed job
    #[arg(long)]
    disable_all: bool,

    /// Run even when disable switches are set
    #[arg(long)]
    force: bool,

    /// Extra object-store directories to create before the run (repeatable)
    #[arg(long = "extra-dir")]
    extra_dirs: Vec<String>,

    /// Days an audited ledger entry is retained
    #[arg(long, default_value_t = jobcron::config::DEFAULT_RETENTION_DAYS)]
    retention_days: i64,

    /// Override for the ledger document path
    #[arg(long)]
    ledger_path: Option<String>,
}

/// Reads input object paths from a local file, one per line.
struct FileInputLister {
    path: PathBuf,
}

#[async_trait]
impl InputLister for FileInputLister {
    async fn list_input_objects(&self, _ctx: &RunContext) -> Result<Vec<String>> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }
}

/// Reads the job definition from a local JSON file.
struct FileDefinitionProvider {
    path: PathBuf,
}

#[async_trait]
impl DefinitionProvider for FileDefinitionProvider {
    async fn provide(&self, _ctx: &RunContext) -> Result<JobDefinition> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        serde_json::from_str(&contents).map_err(|e| {
            CronError::Validation(format!(
                "definition file {} is not valid: {}",
                self.path.display(),
                e
            ))
        })
    }
}

fn build_config(args: &Args) -> RunConfig {
    let mut config = RunConfig::new(args.name.clone(), args.job_root.clone());
    config.enabled = !args.disabled;
    config.disable_all = args.disable_all;
    config.force_run = args.force;
    config.extra_directories = args.extra_dirs.clone();
    config.retention_days = args.retention_days;
    config.ledger_path = args.ledger_path.clone();
    if let (Some(local), Some(remote)) = (&args.asset_file, &args.asset_object) {
        config = config.with_asset(local.clone(), remote.clone());
    }
    config
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = build_config(&args);

    let coordinator = RunCoordinator::new(
        config,
        Arc::new(HttpJobService::new(args.job_service_url.clone())),
        Arc::new(HttpObjectStore::new(args.object_store_url.clone())),
        Arc::new(FileInputLister {
            path: args.inputs_file.clone(),
        }),
        Arc::new(FileDefinitionProvider {
            path: args.definition_file.clone(),
        }),
    );

    coordinator.run().await?;
    Ok(())
}
