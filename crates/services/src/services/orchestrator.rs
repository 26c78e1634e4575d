//! Unified orchestrator: decides which adapter(s) handle a request, sequences
//! the calls and keeps the execution records.

use std::{collections::BTreeSet, sync::Arc, time::Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::services::{
    adapters::{
        AdapterHealth, AdapterResponse, AgentAdapter, AgentCapability, HealthStatus, RoutingHint,
    },
    context_bridge::ContextBridge,
    execution_store::{ExecutionCounts, ExecutionStore},
    routing::{self, AgentClaim, RoutingError, RoutingRules},
    unified::{
        ExecutionRecord, ExecutionState, FieldError, RoutingDecision, SystemKind, UnifiedRequest,
        UnifiedResponse,
    },
};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Invalid request: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Validation(Vec<FieldError>),
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error("Execution {0} not found")]
    NotFound(Uuid),
    #[error("Execution {0} belongs to another user")]
    Forbidden(Uuid),
    #[error("Execution {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: Uuid,
        from: ExecutionState,
        to: ExecutionState,
    },
}

/// A request that has been routed and recorded as `queued`.
#[derive(Debug, Clone)]
pub struct Submission {
    pub execution_id: Uuid,
    pub request: UnifiedRequest,
    pub decision: RoutingDecision,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCatalog {
    pub v1: Vec<String>,
    pub v2: Vec<String>,
    pub all: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestratorHealth {
    pub status: HealthStatus,
    pub systems: Vec<AdapterHealth>,
    pub total_agents: usize,
    pub executions: ExecutionCounts,
}

pub struct UnifiedOrchestrator {
    legacy: Arc<dyn AgentAdapter>,
    graph: Arc<dyn AgentAdapter>,
    store: Arc<dyn ExecutionStore>,
    rules: RoutingRules,
}

impl UnifiedOrchestrator {
    pub fn new(
        legacy: Arc<dyn AgentAdapter>,
        graph: Arc<dyn AgentAdapter>,
        store: Arc<dyn ExecutionStore>,
        rules: RoutingRules,
    ) -> Self {
        Self {
            legacy,
            graph,
            store,
            rules,
        }
    }

    pub async fn route(
        &self,
        request: &UnifiedRequest,
    ) -> Result<RoutingDecision, OrchestratorError> {
        if let Some(requested) = request.manual_agents() {
            let mut claims = Vec::with_capacity(requested.len());
            for name in requested {
                let single = std::slice::from_ref(name);
                claims.push(AgentClaim {
                    name: name.clone(),
                    legacy: self.legacy.can_handle_agents(single).await,
                    graph: self.graph.can_handle_agents(single).await,
                });
            }
            return Ok(routing::partition_manual(&claims)?);
        }

        let analysis = routing::analyze(&request.goal, request.context.as_ref());
        Ok(self.rules.auto_route(&analysis))
    }

    /// Validate, route and record a request without running it.
    pub async fn submit(&self, request: UnifiedRequest) -> Result<Submission, OrchestratorError> {
        request.validate().map_err(OrchestratorError::Validation)?;
        let decision = self.route(&request).await?;

        let execution_id = Uuid::new_v4();
        self.store
            .insert(ExecutionRecord::queued(execution_id, &request, &decision))
            .await;
        info!(
            "Execution {} queued for user {} on {} ({}): {}",
            execution_id,
            request.user_id,
            decision.system,
            decision.agents.join(", "),
            decision.reason
        );

        Ok(Submission {
            execution_id,
            request,
            decision,
        })
    }

    /// Run a submitted request to a terminal state.
    pub async fn run(&self, submission: Submission) -> UnifiedResponse {
        let Submission {
            execution_id,
            request,
            decision,
        } = submission;
        let started = Instant::now();
        let started_at = Utc::now();

        if let Err(e) = self.transition(execution_id, ExecutionState::Processing).await {
            error!("{}", e);
        }

        let hint = RoutingHint::new(decision.agents.clone(), &decision.reason);
        let outcome = match decision.system {
            SystemKind::V1 => self.dispatch(self.legacy.as_ref(), &request, hint).await,
            SystemKind::V2 => self.dispatch(self.graph.as_ref(), &request, hint).await,
            SystemKind::Hybrid => self.execute_hybrid(&request, &decision).await,
        };

        let response = UnifiedResponse {
            execution_id,
            status: outcome.status,
            result: outcome.result,
            agents_involved: outcome.agents_involved,
            tokens_used: outcome.tokens_used,
            cost: outcome.cost,
            system_used: decision.system,
            routing_reason: decision.reason,
            error: outcome.error,
            started_at,
            completed_at: Some(Utc::now()),
            duration_ms: started.elapsed().as_millis() as u64,
        };

        if let Err(e) = self.finish(&response).await {
            error!("{}", e);
        }
        match response.status {
            ExecutionState::Completed => info!(
                "Execution {} completed on {} in {}ms",
                execution_id, response.system_used, response.duration_ms
            ),
            _ => warn!(
                "Execution {} failed on {}: {}",
                execution_id,
                response.system_used,
                response.error.as_deref().unwrap_or("unknown error")
            ),
        }
        response
    }

    pub async fn execute(
        &self,
        request: UnifiedRequest,
    ) -> Result<UnifiedResponse, OrchestratorError> {
        let submission = self.submit(request).await?;
        Ok(self.run(submission).await)
    }

    /// Call one adapter, folding an adapter error into a failed response.
    async fn dispatch(
        &self,
        adapter: &dyn AgentAdapter,
        request: &UnifiedRequest,
        hint: RoutingHint,
    ) -> AdapterResponse {
        match adapter.execute(request, &hint).await {
            Ok(response) => response,
            Err(e) => {
                error!("{} adapter rejected execution: {}", adapter.kind(), e);
                AdapterResponse::failed(adapter.kind(), hint.agents, e.to_string())
            }
        }
    }

    /// Legacy first, then graph with the legacy output bridged in. A graph
    /// failure does not undo the legacy phase.
    async fn execute_hybrid(
        &self,
        request: &UnifiedRequest,
        decision: &RoutingDecision,
    ) -> AdapterResponse {
        let v1_agents = decision.v1_agents.clone().unwrap_or_default();
        let v2_agents = decision.v2_agents.clone().unwrap_or_default();
        let bridge = ContextBridge::new();

        let first = self
            .dispatch(self.legacy.as_ref(), request, RoutingHint::new(v1_agents, &decision.reason))
            .await;
        if !first.is_success() {
            return AdapterResponse {
                system: SystemKind::Hybrid,
                error: first.error.map(|e| format!("legacy phase failed: {e}")),
                ..first
            };
        }

        bridge
            .publish(SystemKind::V1, first.result.clone().unwrap_or(Value::Null))
            .await;
        let hint = RoutingHint::new(v2_agents, &decision.reason)
            .with_bridged_context(bridge.snapshot().await);
        let second = self.dispatch(self.graph.as_ref(), request, hint).await;

        let mut result = Map::new();
        if let Some(v1) = bridge.get(SystemKind::V1).await {
            result.insert(SystemKind::V1.to_string(), v1);
        }
        if let Some(v2) = second.result {
            result.insert(SystemKind::V2.to_string(), v2);
        }

        AdapterResponse {
            system: SystemKind::Hybrid,
            status: second.status,
            result: Some(Value::Object(result)),
            agents_involved: first
                .agents_involved
                .into_iter()
                .chain(second.agents_involved)
                .collect(),
            tokens_used: first.tokens_used + second.tokens_used,
            cost: first.cost + second.cost,
            error: second.error.map(|e| format!("graph phase failed: {e}")),
        }
    }

    async fn transition(
        &self,
        id: Uuid,
        to: ExecutionState,
    ) -> Result<ExecutionRecord, OrchestratorError> {
        let mut record = self.store.get(&id).await.ok_or(OrchestratorError::NotFound(id))?;
        if !record.state.can_transition_to(to) {
            return Err(OrchestratorError::InvalidTransition {
                id,
                from: record.state,
                to,
            });
        }
        let now = Utc::now();
        record.state = to;
        record.updated_at = now;
        if to == ExecutionState::Processing {
            record.started_at = Some(now);
        }
        self.store.put(record.clone()).await;
        Ok(record)
    }

    async fn finish(&self, response: &UnifiedResponse) -> Result<(), OrchestratorError> {
        let mut record = self.transition(response.execution_id, response.status).await?;
        record.completed_at = response.completed_at;
        record.agents = response.agents_involved.clone();
        record.error = response.error.clone();
        record.response = Some(response.clone());
        self.store.put(record).await;
        Ok(())
    }

    async fn owned_record(
        &self,
        id: Uuid,
        requester: &str,
    ) -> Result<ExecutionRecord, OrchestratorError> {
        let record = self.store.get(&id).await.ok_or(OrchestratorError::NotFound(id))?;
        if !record.is_owned_by(requester) {
            return Err(OrchestratorError::Forbidden(id));
        }
        Ok(record)
    }

    /// Status snapshot without the result payload.
    pub async fn status(
        &self,
        id: Uuid,
        requester: &str,
    ) -> Result<ExecutionRecord, OrchestratorError> {
        let mut record = self.owned_record(id, requester).await?;
        record.response = None;
        Ok(record)
    }

    /// Full record, including the response once terminal.
    pub async fn result(
        &self,
        id: Uuid,
        requester: &str,
    ) -> Result<ExecutionRecord, OrchestratorError> {
        self.owned_record(id, requester).await
    }

    pub async fn available_agents(&self) -> AgentCatalog {
        let v1 = dedup(self.legacy.available_agents().await);
        let v2 = dedup(self.graph.available_agents().await);
        let all = dedup(v1.iter().chain(v2.iter()).cloned().collect());
        AgentCatalog { v1, v2, all }
    }

    pub async fn capabilities(&self) -> Vec<AgentCapability> {
        let mut capabilities = self.legacy.capabilities().await;
        capabilities.extend(self.graph.capabilities().await);
        capabilities
    }

    pub async fn health(&self) -> OrchestratorHealth {
        let systems = vec![self.legacy.health().await, self.graph.health().await];
        let healthy = systems
            .iter()
            .filter(|s| s.status == HealthStatus::Healthy)
            .count();
        let status = if healthy == systems.len() {
            HealthStatus::Healthy
        } else if systems.iter().any(|s| s.status != HealthStatus::Unhealthy) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };

        OrchestratorHealth {
            status,
            total_agents: self.available_agents().await.all.len(),
            systems,
            executions: self.store.counts().await,
        }
    }

    pub async fn execution_counts(&self) -> ExecutionCounts {
        self.store.counts().await
    }
}

fn dedup(names: Vec<String>) -> Vec<String> {
    names.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}
