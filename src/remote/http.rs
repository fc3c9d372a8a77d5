//! Thin reqwest-backed implementations of the remote service traits.
//!
//! No retry, no signing, no caching: one request per call, errors mapped
//! straight to [`CronError`].

use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use crate::definition::JobDefinition;
use crate::error::{CronError, Result};
use crate::remote::{JobBrief, JobService, JobStatus, ObjectStore, PutOptions};

const DIRECTORY_CONTENT_TYPE: &str = "application/json; type=directory";
const REPLICATION_HEADER: &str = "durability-level";

impl From<reqwest::Error> for CronError {
    fn from(e: reqwest::Error) -> Self {
        CronError::Transport(e.to_string())
    }
}

fn ensure_success(response: Response, what: &str) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(CronError::Transport(format!(
            "{} failed with status {}",
            what,
            response.status()
        )))
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// REST client for the compute-job service.
#[derive(Debug, Clone)]
pub struct HttpJobService {
    client: Client,
    base_url: String,
}

#[derive(Deserialize)]
struct CreateJobResponse {
    id: String,
}

impl HttpJobService {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

#[async_trait]
impl JobService for HttpJobService {
    async fn create_job(&self, definition: &JobDefinition) -> Result<String> {
        let response = self
            .client
            .post(self.url("/jobs"))
            .json(definition)
            .send()
            .await?;
        let response = ensure_success(response, "create job")?;
        let created: CreateJobResponse = response.json().await?;
        Ok(created.id)
    }

    async fn attach_inputs(&self, job_id: &str, objects: &[String], seal: bool) -> Result<()> {
        let url = self.url(&format!("/jobs/{}/inputs", job_id));
        let response = self
            .client
            .post(url)
            .query(&[("seal", seal)])
            .json(objects)
            .send()
            .await?;
        ensure_success(response, "attach inputs")?;
        Ok(())
    }

    async fn list_jobs(&self, name: &str) -> Result<Vec<JobBrief>> {
        let response = self
            .client
            .get(self.url("/jobs"))
            .query(&[("name", name)])
            .send()
            .await?;
        let response = ensure_success(response, "list jobs")?;
        Ok(response.json().await?)
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus> {
        let response = self
            .client
            .get(self.url(&format!("/jobs/{}", job_id)))
            .send()
            .await?;
        let response = ensure_success(response, "fetch job status")?;
        Ok(response.json().await?)
    }

    async fn cancel_job(&self, job_id: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/jobs/{}/cancel", job_id)))
            .send()
            .await?;
        ensure_success(response, "cancel job")?;
        Ok(())
    }
}

/// REST client for the object store.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: Client,
    base_url: String,
}

impl HttpObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn get_object(&self, path: &str) -> Result<Vec<u8>> {
        let response = self.client.get(self.url(path)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CronError::ObjectNotFound(path.to_string()));
        }
        let response = ensure_success(response, "get object")?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn put_object(&self, path: &str, bytes: Vec<u8>, opts: PutOptions) -> Result<()> {
        let mut request = self.client.put(self.url(path)).body(bytes);
        if let Some(size) = opts.size_hint {
            request = request.header(CONTENT_LENGTH, size);
        }
        if let Some(replication) = opts.replication {
            request = request.header(REPLICATION_HEADER, replication);
        }
        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(CronError::ObjectNotFound(path.to_string()));
        }
        ensure_success(response, "put object")?;
        Ok(())
    }

    async fn ensure_directory(&self, path: &str) -> Result<()> {
        let response = self
            .client
            .put(self.url(path))
            .header(CONTENT_TYPE, DIRECTORY_CONTENT_TYPE)
            .send()
            .await?;
        ensure_success(response, "create directory")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_normalizes_trailing_slash() {
        assert_eq!(join_url("http://store:8080/", "/a/b"), "http://store:8080/a/b");
        assert_eq!(join_url("http://store:8080", "/a/b"), "http://store:8080/a/b");
    }
}
