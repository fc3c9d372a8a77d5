//! Abstract interfaces for the two remote services the coordinator talks to:
//! the compute-job service and the object store.
//!
//! Both are thin pass-throughs; retry and signing are the transport's
//! concern, not this crate's.

pub mod http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::definition::JobDefinition;
use crate::error::Result;

pub use http::{HttpJobService, HttpObjectStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Done,
    Failed,
    Canceled,
}

impl JobState {
    /// A terminal job will never transition again; only terminal jobs can be
    /// audited.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Queued | JobState::Running)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Queued => write!(f, "queued"),
            JobState::Running => write!(f, "running"),
            JobState::Done => write!(f, "done"),
            JobState::Failed => write!(f, "failed"),
            JobState::Canceled => write!(f, "canceled"),
        }
    }
}

/// Minimal listing entry returned by a name query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobBrief {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobStats {
    #[serde(default)]
    pub errors: u64,
}

/// Full status of a remote job. Fetched fresh each time it is needed, never
/// cached across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    pub id: String,
    pub name: String,
    pub state: JobState,
    #[serde(default)]
    pub input_done: bool,
    pub time_created: DateTime<Utc>,
    #[serde(default)]
    pub time_done: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stats: JobStats,
}

/// Options for an object upload.
#[derive(Debug, Clone, Copy, Default)]
pub struct PutOptions {
    pub size_hint: Option<u64>,
    pub replication: Option<u32>,
}

/// Remote compute-job service.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Create a job from a definition and return its assigned id.
    async fn create_job(&self, definition: &JobDefinition) -> Result<String>;

    /// Attach input objects to a job. With `seal` set, the job's input
    /// stream is closed and no further objects may be added.
    async fn attach_inputs(&self, job_id: &str, objects: &[String], seal: bool) -> Result<()>;

    /// List jobs matching a name.
    async fn list_jobs(&self, name: &str) -> Result<Vec<JobBrief>>;

    /// Fetch the full status of one job.
    async fn job_status(&self, job_id: &str) -> Result<JobStatus>;

    /// Cancel a live job.
    async fn cancel_job(&self, job_id: &str) -> Result<()>;
}

/// Remote object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch an object's bytes. A missing object is
    /// [`CronError::ObjectNotFound`](crate::error::CronError::ObjectNotFound).
    async fn get_object(&self, path: &str) -> Result<Vec<u8>>;

    /// Store an object, replacing any existing one (last writer wins).
    async fn put_object(&self, path: &str, bytes: Vec<u8>, opts: PutOptions) -> Result<()>;

    /// Create a directory. Idempotent; creates parents as needed.
    async fn ensure_directory(&self, path: &str) -> Result<()>;
}
