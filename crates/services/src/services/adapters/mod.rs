//! Uniform contract over the two backend agent systems.

pub mod graph;
pub mod legacy;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::Display;
use thiserror::Error;

use crate::services::{
    backends::{BackendError, MemoryStats},
    unified::{ExecutionState, SystemKind, UnifiedRequest},
};

pub use graph::GraphAdapter;
pub use legacy::LegacyAdapter;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("No agent assigned to {0} adapter")]
    NoAgentAssigned(SystemKind),
    #[error("Agent '{agent}' is not registered with the {system} system")]
    UnknownAgent { system: SystemKind, agent: String },
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Per-call routing information handed to an adapter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingHint {
    pub agents: Vec<String>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bridged_context: Option<Value>,
}

impl RoutingHint {
    pub fn new(agents: Vec<String>, reason: impl Into<String>) -> Self {
        Self {
            agents,
            reason: reason.into(),
            bridged_context: None,
        }
    }

    pub fn with_bridged_context(mut self, context: Value) -> Self {
        self.bridged_context = Some(context);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterResponse {
    pub system: SystemKind,
    pub status: ExecutionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    pub agents_involved: Vec<String>,
    pub tokens_used: u64,
    pub cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AdapterResponse {
    pub fn failed(system: SystemKind, agents: Vec<String>, error: impl Into<String>) -> Self {
        Self {
            system,
            status: ExecutionState::Failed,
            result: None,
            agents_involved: agents,
            tokens_used: 0,
            cost: 0.0,
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ExecutionState::Completed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapability {
    pub agent: String,
    pub system: SystemKind,
    pub description: String,
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterHealth {
    pub system: SystemKind,
    pub status: HealthStatus,
    pub agent_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<MemoryStats>,
}

/// One backend agent system behind a common interface.
///
/// Discovery methods never fail: an unreachable backend reports no agents.
/// `execute` may return an error; callers turn it into a failed response.
#[async_trait]
pub trait AgentAdapter: Send + Sync {
    fn kind(&self) -> SystemKind;

    async fn execute(
        &self,
        request: &UnifiedRequest,
        hint: &RoutingHint,
    ) -> Result<AdapterResponse, AdapterError>;

    async fn available_agents(&self) -> Vec<String>;

    async fn capabilities(&self) -> Vec<AgentCapability>;

    async fn health(&self) -> AdapterHealth;

    async fn can_handle_agents(&self, agents: &[String]) -> bool {
        if agents.is_empty() {
            return false;
        }
        let available = self.available_agents().await;
        agents.iter().all(|agent| available.contains(agent))
    }
}
