//! Request, response and execution record types shared by the orchestrator,
//! the adapters and the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

use crate::services::routing::RequestAnalysis;

pub const MAX_GOAL_LENGTH: usize = 5000;
pub const MAX_REQUESTED_AGENTS: usize = 20;

/// Which backend agent system handles a request.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SystemKind {
    /// Legacy direct-invocation agents
    V1,
    /// Graph-orchestrated agents
    V2,
    /// Legacy first, then graph, sharing context
    Hybrid,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AgentSelection {
    #[default]
    Auto,
    Manual,
}

/// Free-form context bag a caller can attach to a goal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestContext {
    pub fn has_campaign(&self) -> bool {
        self.campaign.as_ref().is_some_and(is_present)
    }

    pub fn has_icp(&self) -> bool {
        self.icp.as_ref().is_some_and(is_present)
    }

    pub fn has_brand(&self) -> bool {
        self.brand.as_ref().is_some_and(is_present)
    }

    pub fn has_constraints(&self) -> bool {
        self.constraints.as_ref().is_some_and(is_present)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

/// Null, empty strings, arrays and objects count as absent.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedRequest {
    pub goal: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<RequestContext>,
    #[serde(default)]
    pub agent_selection: AgentSelection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agents: Option<Vec<String>>,
}

impl UnifiedRequest {
    pub fn new(goal: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            user_id: user_id.into(),
            context: None,
            agent_selection: AgentSelection::Auto,
            agents: None,
        }
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_agents(mut self, agents: Vec<String>) -> Self {
        self.agent_selection = AgentSelection::Manual;
        self.agents = Some(agents);
        self
    }

    /// Agents the caller picked explicitly, if selection is manual.
    pub fn manual_agents(&self) -> Option<&[String]> {
        match self.agent_selection {
            AgentSelection::Manual => self.agents.as_deref().filter(|a| !a.is_empty()),
            AgentSelection::Auto => None,
        }
    }

    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        let goal = self.goal.trim();
        if goal.is_empty() {
            errors.push(FieldError::new("goal", "goal must not be empty"));
        } else if goal.chars().count() > MAX_GOAL_LENGTH {
            errors.push(FieldError::new(
                "goal",
                format!("goal must be at most {MAX_GOAL_LENGTH} characters"),
            ));
        }

        if self.user_id.trim().is_empty() {
            errors.push(FieldError::new("userId", "userId must not be empty"));
        }

        match (&self.agent_selection, &self.agents) {
            (AgentSelection::Manual, None) => {
                errors.push(FieldError::new(
                    "agents",
                    "manual agent selection requires at least one agent",
                ));
            }
            (AgentSelection::Manual, Some(agents)) if agents.is_empty() => {
                errors.push(FieldError::new(
                    "agents",
                    "manual agent selection requires at least one agent",
                ));
            }
            _ => {}
        }

        if let Some(agents) = &self.agents {
            if agents.len() > MAX_REQUESTED_AGENTS {
                errors.push(FieldError::new(
                    "agents",
                    format!("at most {MAX_REQUESTED_AGENTS} agents may be requested"),
                ));
            }
            for (idx, agent) in agents.iter().enumerate() {
                if agent.trim().is_empty() {
                    errors.push(FieldError::new(
                        format!("agents[{idx}]"),
                        "agent name must not be empty",
                    ));
                }
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecision {
    pub system: SystemKind,
    pub agents: Vec<String>,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v1_agents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub v2_agents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<RequestAnalysis>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExecutionState {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl ExecutionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionState::Completed | ExecutionState::Failed)
    }

    pub fn can_transition_to(&self, next: ExecutionState) -> bool {
        matches!(
            (self, next),
            (ExecutionState::Queued, ExecutionState::Processing)
                | (ExecutionState::Queued, ExecutionState::Failed)
                | (ExecutionState::Processing, ExecutionState::Completed)
                | (ExecutionState::Processing, ExecutionState::Failed)
        )
    }
}

/// In-memory bookkeeping for one submitted request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub user_id: String,
    pub goal: String,
    pub state: ExecutionState,
    pub system: SystemKind,
    pub agents: Vec<String>,
    pub routing_reason: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<UnifiedResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionRecord {
    pub fn queued(id: Uuid, request: &UnifiedRequest, decision: &RoutingDecision) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id: request.user_id.clone(),
            goal: request.goal.clone(),
            state: ExecutionState::Queued,
            system: decision.system,
            agents: decision.agents.clone(),
            routing_reason: decision.reason.clone(),
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            response: None,
            error: None,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Terminal payload handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedResponse {
    pub execution_id: Uuid,
    pub status: ExecutionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    pub agents_involved: Vec<String>,
    pub tokens_used: u64,
    pub cost: f64,
    pub system_used: SystemKind,
    pub routing_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
}
