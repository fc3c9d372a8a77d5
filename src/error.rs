use thiserror::Error;

#[derive(Error, Debug)]
pub enum CronError {
    #[error("Job is disabled (global or per-job switch)")]
    JobDisabled,

    #[error("No input objects available for this run")]
    NoInputObjects,

    #[error("A job with this name is already running ({seconds_running}s elapsed)")]
    AlreadyRunning { seconds_running: i64 },

    #[error("Name collision: {count} live jobs named {name:?}")]
    NameCollision { name: String, count: usize },

    #[error("Invalid job definition: {0}")]
    Validation(String),

    #[error("Ledger document is corrupt: {0}")]
    LedgerCorruption(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Job not yet complete: {0}")]
    JobNotComplete(String),

    #[error("Audit enrichment hook failed: {0}")]
    Hook(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CronError {
    /// True for the recognized, expected conditions that end a run cleanly
    /// without surfacing an error to the caller.
    pub fn is_clean_stop(&self) -> bool {
        matches!(
            self,
            CronError::JobDisabled | CronError::NoInputObjects | CronError::AlreadyRunning { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CronError>;
