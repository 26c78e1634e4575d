//! Request analysis and the routing decision table.
//!
//! Routing is deterministic: the goal is scanned for a handful of keywords and
//! the context bag is checked for fields that need multi-step orchestration.
//! The rules live in [`RoutingRules`] so the agent lists can be configured
//! without touching the table itself.

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;
use tracing::warn;

use crate::services::unified::{RequestContext, RoutingDecision, SystemKind};

pub const MAX_KEYWORDS: usize = 10;

const BUSINESS_INTELLIGENCE_KEYWORDS: &[&str] = &["research", "analysis", "market"];
const MARKETING_EXECUTION_KEYWORDS: &[&str] = &["campaign", "marketing", "advertising"];
const HIGH_COMPLEXITY_MARKERS: &[&str] = &[
    "comprehensive",
    "complete",
    "full",
    "end-to-end",
    "orchestrate",
];
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "is", "are", "be", "this", "that", "it", "as", "our", "my", "me", "we", "i",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskType {
    BusinessIntelligence,
    MarketingExecution,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Complexity {
    Standard,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestAnalysis {
    pub task_type: TaskType,
    pub complexity: Complexity,
    pub keywords: Vec<String>,
    pub requires_orchestration: bool,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("No valid agents found for selection: {}", .0.join(", "))]
    NoValidAgents(Vec<String>),
}

fn words(goal: &str) -> impl Iterator<Item = String> + '_ {
    goal.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Classify a goal and its context.
///
/// All keyword lists are lower-case substring checks, so "marketing" also
/// hits "market" and business intelligence wins.
pub fn analyze(goal: &str, context: Option<&RequestContext>) -> RequestAnalysis {
    let lowered = goal.to_lowercase();
    let has_any = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));

    let task_type = if has_any(BUSINESS_INTELLIGENCE_KEYWORDS) {
        TaskType::BusinessIntelligence
    } else if has_any(MARKETING_EXECUTION_KEYWORDS) {
        TaskType::MarketingExecution
    } else {
        TaskType::General
    };

    let complexity = if has_any(HIGH_COMPLEXITY_MARKERS) {
        Complexity::High
    } else {
        Complexity::Standard
    };

    RequestAnalysis {
        task_type,
        complexity,
        keywords: extract_keywords(goal),
        requires_orchestration: context.is_some_and(requires_orchestration),
    }
}

pub fn extract_keywords(goal: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for word in words(goal) {
        if STOPWORDS.contains(&word.as_str()) || keywords.contains(&word) {
            continue;
        }
        keywords.push(word);
        if keywords.len() == MAX_KEYWORDS {
            break;
        }
    }
    keywords
}

pub fn requires_orchestration(context: &RequestContext) -> bool {
    context.has_campaign()
        || (context.has_icp() && context.has_brand())
        || context.has_constraints()
}

/// Agent lists used by the auto-routing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingRules {
    pub orchestrator_agent: String,
    pub business_intelligence_agents: Vec<String>,
    pub marketing_agents: Vec<String>,
}

impl Default for RoutingRules {
    fn default() -> Self {
        Self {
            orchestrator_agent: "orchestrator".to_string(),
            business_intelligence_agents: vec!["business-intelligence".to_string()],
            marketing_agents: vec!["marketing-execution".to_string()],
        }
    }
}

impl RoutingRules {
    pub fn auto_route(&self, analysis: &RequestAnalysis) -> RoutingDecision {
        let (system, agents, reason) = if analysis.complexity == Complexity::High
            || analysis.requires_orchestration
        {
            (
                SystemKind::V2,
                vec![self.orchestrator_agent.clone()],
                if analysis.complexity == Complexity::High {
                    "High complexity goal routed to graph orchestration".to_string()
                } else {
                    "Context requires multi-step orchestration".to_string()
                },
            )
        } else {
            match analysis.task_type {
                TaskType::BusinessIntelligence => (
                    SystemKind::V1,
                    self.business_intelligence_agents.clone(),
                    "Business intelligence task routed to legacy agents".to_string(),
                ),
                TaskType::MarketingExecution => (
                    SystemKind::V2,
                    self.marketing_agents.clone(),
                    "Marketing execution task routed to graph agents".to_string(),
                ),
                TaskType::General => (
                    SystemKind::V2,
                    vec![self.orchestrator_agent.clone()],
                    "General task routed to graph orchestrator".to_string(),
                ),
            }
        };

        RoutingDecision {
            system,
            agents,
            reason,
            v1_agents: None,
            v2_agents: None,
            analysis: Some(analysis.clone()),
        }
    }
}

/// Which adapters claim a manually requested agent name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentClaim {
    pub name: String,
    pub legacy: bool,
    pub graph: bool,
}

/// Split an explicit selection between the two systems.
///
/// A name both systems claim goes to the graph side so the two lists stay
/// disjoint. Names nobody claims are dropped.
pub fn partition_manual(claims: &[AgentClaim]) -> Result<RoutingDecision, RoutingError> {
    let mut v1 = Vec::new();
    let mut v2 = Vec::new();
    let mut unknown = Vec::new();

    for claim in claims {
        let target = if claim.graph {
            &mut v2
        } else if claim.legacy {
            &mut v1
        } else {
            &mut unknown
        };
        if !target.contains(&claim.name) {
            target.push(claim.name.clone());
        }
    }

    if v1.is_empty() && v2.is_empty() {
        return Err(RoutingError::NoValidAgents(unknown));
    }
    if !unknown.is_empty() {
        warn!("Ignoring unrecognised agents in manual selection: {}", unknown.join(", "));
    }

    let decision = match (v1.is_empty(), v2.is_empty()) {
        (false, false) => RoutingDecision {
            system: SystemKind::Hybrid,
            agents: v1.iter().chain(v2.iter()).cloned().collect(),
            reason: format!(
                "Manual selection spans both systems ({} legacy, {} graph)",
                v1.len(),
                v2.len()
            ),
            v1_agents: Some(v1),
            v2_agents: Some(v2),
            analysis: None,
        },
        (false, true) => RoutingDecision {
            system: SystemKind::V1,
            reason: "Manual selection handled by legacy agents".to_string(),
            agents: v1,
            v1_agents: None,
            v2_agents: None,
            analysis: None,
        },
        _ => RoutingDecision {
            system: SystemKind::V2,
            reason: "Manual selection handled by graph agents".to_string(),
            agents: v2,
            v1_agents: None,
            v2_agents: None,
            analysis: None,
        },
    };

    Ok(decision)
}
