//! Clients for the external systems the adapters sit on top of.
//!
//! Each collaborator is a trait so the adapters never see transport details;
//! the HTTP implementations talk JSON over reqwest.

pub mod job_queue;
pub mod legacy;
pub mod memory;
pub mod registry;

use reqwest::{Response, StatusCode};
use thiserror::Error;

pub use job_queue::{GraphJob, HttpJobQueue, JobQueue, JobSnapshot, JobState};
pub use legacy::{
    HttpLegacyBackend, LegacyAgentBackend, LegacyAgentInput, LegacyAgentOutput, LegacyUsage,
};
pub use memory::{HttpMemoryService, LocalMemoryService, MemoryService, MemoryStats};
pub use registry::{AgentDescriptor, AgentRegistry, StaticAgentRegistry};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("Malformed response from {service}: {detail}")]
    Malformed {
        service: &'static str,
        detail: String,
    },
    #[error("{0}")]
    Rejected(String),
}

/// Turn a non-success response into [`BackendError::Status`], keeping the body.
pub(crate) async fn check_status(
    service: &'static str,
    response: Response,
) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Status {
        service,
        status,
        body,
    })
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Join a fixed prefix and caller-supplied path segments. Each segment is
/// percent-encoded so it stays a single segment on the wire.
pub(crate) fn segment_url(base: &str, prefix: &str, segments: &[&str]) -> String {
    let mut path = prefix.trim_matches('/').to_string();
    for segment in segments {
        path.push('/');
        path.push_str(&urlencoding::encode(segment));
    }
    join_url(base, &path)
}
