use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tracing::{debug, error, warn};

use super::{
    AdapterError, AdapterHealth, AdapterResponse, AgentAdapter, AgentCapability, HealthStatus,
    RoutingHint,
};
use crate::services::{
    backends::{
        AgentRegistry, BackendError, GraphJob, JobQueue, JobSnapshot, JobState, MemoryService,
    },
    unified::{ExecutionState, SystemKind, UnifiedRequest},
};

fn memory_key(user_id: &str) -> String {
    format!("graph:context:{user_id}")
}

/// Adapter over the graph-orchestrated agents.
///
/// A call recalls the user's memory, queues one job for the first hinted
/// agent, waits for it and writes the output back to memory.
#[derive(Clone)]
pub struct GraphAdapter {
    registry: Arc<dyn AgentRegistry>,
    queue: Arc<dyn JobQueue>,
    memory: Arc<dyn MemoryService>,
    poll_interval: Duration,
}

impl GraphAdapter {
    pub fn new(
        registry: Arc<dyn AgentRegistry>,
        queue: Arc<dyn JobQueue>,
        memory: Arc<dyn MemoryService>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            registry,
            queue,
            memory,
            poll_interval,
        }
    }

    fn job_context(request: &UnifiedRequest, hint: &RoutingHint) -> Value {
        let mut context = match request.context.as_ref().map(|c| c.to_value()) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        if let Some(bridged) = &hint.bridged_context {
            context.insert("bridged".to_string(), bridged.clone());
        }
        Value::Object(context)
    }

    async fn wait_for(&self, job_id: &str) -> Result<JobSnapshot, BackendError> {
        loop {
            let snapshot = self.queue.fetch(job_id).await?;
            if snapshot.state.is_terminal() {
                return Ok(snapshot);
            }
            debug!("Graph job {} is {:?}, polling again", job_id, snapshot.state);
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn run_job(&self, job: &GraphJob) -> Result<JobSnapshot, BackendError> {
        let job_id = self.queue.submit(job).await?;
        debug!("Submitted graph job {} for agent '{}'", job_id, job.agent);
        self.wait_for(&job_id).await
    }

    fn normalize(agent: &str, snapshot: JobSnapshot) -> AdapterResponse {
        let completed = snapshot.state == JobState::Completed;
        AdapterResponse {
            system: SystemKind::V2,
            status: if completed {
                ExecutionState::Completed
            } else {
                ExecutionState::Failed
            },
            result: if completed {
                Some(snapshot.output.unwrap_or_else(|| Value::Object(Map::new())))
            } else {
                snapshot.output
            },
            agents_involved: vec![agent.to_string()],
            tokens_used: snapshot.tokens_used.unwrap_or(0),
            cost: snapshot.cost.unwrap_or(0.0),
            error: if completed {
                None
            } else {
                Some(
                    snapshot
                        .error
                        .unwrap_or_else(|| format!("Graph job {} failed", snapshot.id)),
                )
            },
        }
    }
}

#[async_trait]
impl AgentAdapter for GraphAdapter {
    fn kind(&self) -> SystemKind {
        SystemKind::V2
    }

    async fn execute(
        &self,
        request: &UnifiedRequest,
        hint: &RoutingHint,
    ) -> Result<AdapterResponse, AdapterError> {
        let agent = hint
            .agents
            .first()
            .ok_or(AdapterError::NoAgentAssigned(SystemKind::V2))?;
        if !self.available_agents().await.contains(agent) {
            return Err(AdapterError::UnknownAgent {
                system: SystemKind::V2,
                agent: agent.clone(),
            });
        }

        let key = memory_key(&request.user_id);
        let memory = match self.memory.recall(&key).await {
            Ok(memory) => memory,
            Err(e) => {
                warn!("Memory recall failed for {}: {}", key, e);
                None
            }
        };

        let job = GraphJob {
            agent: agent.clone(),
            goal: request.goal.trim().to_string(),
            user_id: request.user_id.clone(),
            context: Self::job_context(request, hint),
            memory,
            requested_agents: hint.agents.clone(),
        };

        let snapshot = match self.run_job(&job).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Graph agent '{}' failed: {}", agent, e);
                return Ok(AdapterResponse::failed(
                    SystemKind::V2,
                    vec![agent.clone()],
                    e.to_string(),
                ));
            }
        };

        if snapshot.state == JobState::Completed {
            let entry = json!({
                "goal": job.goal,
                "agent": agent,
                "output": snapshot.output.clone().unwrap_or(Value::Null),
            });
            if let Err(e) = self.memory.remember(&key, entry).await {
                warn!("Memory write failed for {}: {}", key, e);
            }
        }

        Ok(Self::normalize(agent, snapshot))
    }

    async fn available_agents(&self) -> Vec<String> {
        match self.registry.list().await {
            Ok(agents) => agents.into_iter().map(|a| a.name).collect(),
            Err(e) => {
                warn!("Failed to list graph agents: {}", e);
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
                    system: SystemKind::V2,
                    description: a.description,
                    capabilities: a.capabilities,
                })
                .collect(),
            Err(e) => {
                warn!("Failed to list graph capabilities: {}", e);
                Vec::new()
            }
        }
    }

    async fn health(&self) -> AdapterHealth {
        let agent_count = self.available_agents().await.len();
        let (status, detail) = match (self.queue.ping().await, self.memory.ping().await) {
            (Err(e), _) => (HealthStatus::Unhealthy, Some(format!("job queue: {e}"))),
            (Ok(()), Err(e)) => (HealthStatus::Degraded, Some(format!("memory service: {e}"))),
            (Ok(()), Ok(())) if agent_count == 0 => (
                HealthStatus::Degraded,
                Some("No graph agents registered".to_string()),
            ),
            (Ok(()), Ok(())) => (HealthStatus::Healthy, None),
        };

        AdapterHealth {
            system: SystemKind::V2,
            status,
            agent_count,
            detail,
            memory: self.memory.stats(),
        }
    }
}
