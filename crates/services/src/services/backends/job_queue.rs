use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{BackendError, check_status, join_url, segment_url};

const SERVICE: &str = "job queue";

/// Work item submitted to the graph pipeline's queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphJob {
    pub agent: String,
    pub goal: String,
    pub user_id: String,
    pub context: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<Value>,
    pub requested_agents: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Waiting,
    Active,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub id: String,
    pub state: JobState,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub tokens_used: Option<u64>,
    #[serde(default)]
    pub cost: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    id: String,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job, returning its id.
    async fn submit(&self, job: &GraphJob) -> Result<String, BackendError>;

    async fn fetch(&self, job_id: &str) -> Result<JobSnapshot, BackendError>;

    async fn ping(&self) -> Result<(), BackendError>;
}

#[derive(Debug, Clone)]
pub struct HttpJobQueue {
    client: Client,
    base_url: String,
}

impl HttpJobQueue {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl JobQueue for HttpJobQueue {
    async fn submit(&self, job: &GraphJob) -> Result<String, BackendError> {
        let response = self
            .client
            .post(join_url(&self.base_url, "jobs"))
            .json(job)
            .send()
            .await?;
        let response = check_status(SERVICE, response).await?;
        let submitted: SubmitResponse =
            response.json().await.map_err(|e| BackendError::Malformed {
                service: SERVICE,
                detail: e.to_string(),
            })?;
        Ok(submitted.id)
    }

    async fn fetch(&self, job_id: &str) -> Result<JobSnapshot, BackendError> {
        let response = self
            .client
            .get(segment_url(&self.base_url, "jobs", &[job_id]))
            .send()
            .await?;
        let response = check_status(SERVICE, response).await?;
        response.json().await.map_err(|e| BackendError::Malformed {
            service: SERVICE,
            detail: e.to_string(),
        })
    }

    async fn ping(&self) -> Result<(), BackendError> {
        let response = self
            .client
            .get(join_url(&self.base_url, "health"))
            .send()
            .await?;
        check_status(SERVICE, response).await.map(|_| ())
    }
}
