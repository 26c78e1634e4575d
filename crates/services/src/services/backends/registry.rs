use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::BackendError;

/// An agent as a backend registry describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl AgentDescriptor {
    pub fn new(name: &str, description: &str, capabilities: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        }
    }
}

#[async_trait]
pub trait AgentRegistry: Send + Sync {
    async fn list(&self) -> Result<Vec<AgentDescriptor>, BackendError>;
}

/// Registry backed by a catalog fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticAgentRegistry {
    agents: Vec<AgentDescriptor>,
}

impl StaticAgentRegistry {
    pub fn new(agents: Vec<AgentDescriptor>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl AgentRegistry for StaticAgentRegistry {
    async fn list(&self) -> Result<Vec<AgentDescriptor>, BackendError> {
        Ok(self.agents.clone())
    }
}
