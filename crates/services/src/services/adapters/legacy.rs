use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{error, warn};

use super::{
    AdapterError, AdapterHealth, AdapterResponse, AgentAdapter, AgentCapability, HealthStatus,
    RoutingHint,
};
use crate::services::{
    backends::{AgentRegistry, LegacyAgentBackend, LegacyAgentInput, LegacyAgentOutput},
    unified::{ExecutionState, SystemKind, UnifiedRequest},
};

/// Adapter over the legacy direct-invocation agents.
#[derive(Clone)]
pub struct LegacyAdapter {
    registry: Arc<dyn AgentRegistry>,
    backend: Arc<dyn LegacyAgentBackend>,
}

impl LegacyAdapter {
    pub fn new(registry: Arc<dyn AgentRegistry>, backend: Arc<dyn LegacyAgentBackend>) -> Self {
        Self { registry, backend }
    }

    fn to_legacy_input(request: &UnifiedRequest, hint: &RoutingHint) -> LegacyAgentInput {
        let context = request.context.clone().unwrap_or_default();
        LegacyAgentInput {
            task: request.goal.trim().to_string(),
            user_id: request.user_id.clone(),
            campaign_context: context.campaign,
            icp: context.icp,
            brand: context.brand,
            constraints: context
                .constraints
                .unwrap_or_else(|| Value::Object(Map::new())),
            shared_context: hint.bridged_context.clone(),
        }
    }

    fn normalize(agent: &str, output: LegacyAgentOutput) -> AdapterResponse {
        let usage = output.usage.unwrap_or_default();
        if output.success {
            AdapterResponse {
                system: SystemKind::V1,
                status: ExecutionState::Completed,
                result: Some(output.data.unwrap_or_else(|| Value::Object(Map::new()))),
                agents_involved: vec![agent.to_string()],
                tokens_used: usage.tokens,
                cost: usage.cost_usd,
                error: None,
            }
        } else {
            AdapterResponse {
                system: SystemKind::V1,
                status: ExecutionState::Failed,
                result: output.data,
                agents_involved: vec![agent.to_string()],
                tokens_used: usage.tokens,
                cost: usage.cost_usd,
                error: Some(
                    output
                        .error
                        .unwrap_or_else(|| format!("Legacy agent '{agent}' reported failure")),
                ),
            }
        }
    }
}

#[async_trait]
impl AgentAdapter for LegacyAdapter {
    fn kind(&self) -> SystemKind {
        SystemKind::V1
    }

    async fn execute(
        &self,
        request: &UnifiedRequest,
        hint: &RoutingHint,
    ) -> Result<AdapterResponse, AdapterError> {
        let agent = hint
            .agents
            .first()
            .ok_or(AdapterError::NoAgentAssigned(SystemKind::V1))?;
        if hint.agents.len() > 1 {
            warn!(
                "Legacy adapter runs one agent per call; using '{}' and ignoring {}",
                agent,
                hint.agents[1..].join(", ")
            );
        }
        if !self.available_agents().await.contains(agent) {
            return Err(AdapterError::UnknownAgent {
                system: SystemKind::V1,
                agent: agent.clone(),
            });
        }

        let input = Self::to_legacy_input(request, hint);
        match self.backend.invoke(agent, &input).await {
            Ok(output) => Ok(Self::normalize(agent, output)),
            Err(e) => {
                error!("Legacy agent '{}' failed: {}", agent, e);
                Ok(AdapterResponse::failed(
                    SystemKind::V1,
                    vec![agent.clone()],
                    e.to_string(),
                ))
            }
        }
    }

    async fn available_agents(&self) -> Vec<String> {
        match self.registry.list().await {
            Ok(agents) => agents.into_iter().map(|a| a.name).collect(),
            Err(e) => {
                warn!("Failed to list legacy agents: {}", e);
                Vec::new()
            }
        }
    }

    async fn capabilities(&self) -> Vec<AgentCapability> {
        match self.registry.list().await {
            Ok(agents) => agents
                .into_iter()
                .map(|a| AgentCapability {
                    agent: a.name,
                    system: SystemKind::V1,
                    description: a.description,
                    capabilities: a.capabilities,
                })
                .collect(),
            Err(e) => {
                warn!("Failed to list legacy capabilities: {}", e);
                Vec::new()
            }
        }
    }

    async fn health(&self) -> AdapterHealth {
        let agent_count = self.available_agents().await.len();
        let (status, detail) = match self.backend.ping().await {
            Ok(()) if agent_count > 0 => (HealthStatus::Healthy, None),
            Ok(()) => (
                HealthStatus::Degraded,
                Some("No legacy agents registered".to_string()),
            ),
            Err(e) => (HealthStatus::Unhealthy, Some(e.to_string())),
        };

        AdapterHealth {
            system: SystemKind::V1,
            status,
            agent_count,
            detail,
            memory: None,
        }
    }
}
