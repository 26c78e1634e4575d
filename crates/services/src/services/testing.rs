//! Scripted backends for exercising adapters and the orchestrator without
//! the external services.

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::services::backends::{
    AgentDescriptor, BackendError, GraphJob, JobQueue, JobSnapshot, JobState, LegacyAgentBackend,
    LegacyAgentInput, LegacyAgentOutput, LegacyUsage, MemoryService, StaticAgentRegistry,
};

pub fn legacy_registry() -> StaticAgentRegistry {
    StaticAgentRegistry::new(vec![
        AgentDescriptor::new(
            "business-intelligence",
            "Market and competitor intelligence",
            &["research", "analysis"],
        ),
        AgentDescriptor::new("competitor-analysis", "Competitor teardown", &["analysis"]),
        AgentDescriptor::new("shared-writer", "Copywriting", &["content"]),
    ])
}

pub fn graph_registry() -> StaticAgentRegistry {
    StaticAgentRegistry::new(vec![
        AgentDescriptor::new("orchestrator", "Plans and sequences agents", &["orchestration"]),
        AgentDescriptor::new(
            "marketing-execution",
            "Runs campaigns end to end",
            &["campaigns", "advertising"],
        ),
        AgentDescriptor::new("content-creator", "Produces campaign assets", &["content"]),
        AgentDescriptor::new("shared-writer", "Copywriting", &["content"]),
    ])
}

enum LegacyScript {
    Succeed(LegacyAgentOutput),
    Fail(String),
}

/// Legacy backend that records each invocation and replies from a script.
pub struct ScriptedLegacyBackend {
    script: LegacyScript,
    online: bool,
    calls: Mutex<Vec<(String, LegacyAgentInput)>>,
}

impl Default for ScriptedLegacyBackend {
    fn default() -> Self {
        Self::succeeding(LegacyAgentOutput {
            success: true,
            data: Some(json!({ "summary": "legacy result" })),
            error: None,
            usage: Some(LegacyUsage {
                tokens: 100,
                cost_usd: 0.01,
            }),
        })
    }
}

impl ScriptedLegacyBackend {
    pub fn succeeding(output: LegacyAgentOutput) -> Self {
        Self {
            script: LegacyScript::Succeed(output),
            online: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            script: LegacyScript::Fail(message.to_string()),
            online: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn offline(mut self) -> Self {
        self.online = false;
        self
    }

    pub fn calls(&self) -> Vec<(String, LegacyAgentInput)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LegacyAgentBackend for ScriptedLegacyBackend {
    async fn invoke(
        &self,
        agent: &str,
        input: &LegacyAgentInput,
    ) -> Result<LegacyAgentOutput, BackendError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((agent.to_string(), input.clone()));
        }
        match &self.script {
            LegacyScript::Succeed(output) => Ok(output.clone()),
            LegacyScript::Fail(message) => Err(BackendError::Rejected(message.clone())),
        }
    }

    async fn ping(&self) -> Result<(), BackendError> {
        if self.online {
            Ok(())
        } else {
            Err(BackendError::Rejected("legacy service offline".to_string()))
        }
    }
}

/// Job queue that finishes every job after a configurable number of polls.
pub struct ScriptedJobQueue {
    outcome: JobState,
    output: Option<Value>,
    error: Option<String>,
    pending_polls: usize,
    online: bool,
    submitted: Mutex<Vec<GraphJob>>,
    fetches: AtomicUsize,
}

impl ScriptedJobQueue {
    pub fn completing(output: Value) -> Self {
        Self {
            outcome: JobState::Completed,
            output: Some(output),
            error: None,
            pending_polls: 0,
            online: true,
            submitted: Mutex::new(Vec::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: JobState::Failed,
            output: None,
            error: Some(message.to_string()),
            ..Self::completing(Value::Null)
        }
    }

    pub fn pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    pub fn offline(mut self) -> Self {
        self.online = false;
        self
    }

    pub fn submitted(&self) -> Vec<GraphJob> {
        self.submitted.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobQueue for ScriptedJobQueue {
    async fn submit(&self, job: &GraphJob) -> Result<String, BackendError> {
        if !self.online {
            return Err(BackendError::Rejected("job queue offline".to_string()));
        }
        let mut submitted = self
            .submitted
            .lock()
            .map_err(|_| BackendError::Rejected("poisoned".to_string()))?;
        submitted.push(job.clone());
        Ok(format!("job-{}", submitted.len()))
    }

    async fn fetch(&self, job_id: &str) -> Result<JobSnapshot, BackendError> {
        let seen = self.fetches.fetch_add(1, Ordering::SeqCst);
        let state = if seen < self.pending_polls {
            JobState::Active
        } else {
            self.outcome
        };
        Ok(JobSnapshot {
            id: job_id.to_string(),
            state,
            output: if state.is_terminal() {
                self.output.clone()
            } else {
                None
            },
            error: self.error.clone(),
            tokens_used: Some(200),
            cost: Some(0.05),
        })
    }

    async fn ping(&self) -> Result<(), BackendError> {
        if self.online {
            Ok(())
        } else {
            Err(BackendError::Rejected("job queue offline".to_string()))
        }
    }
}

/// Memory service whose every call fails.
pub struct OfflineMemory;

#[async_trait]
impl MemoryService for OfflineMemory {
    async fn recall(&self, _key: &str) -> Result<Option<Value>, BackendError> {
        Err(BackendError::Rejected("memory service offline".to_string()))
    }

    async fn remember(&self, _key: &str, _value: Value) -> Result<(), BackendError> {
        Err(BackendError::Rejected("memory service offline".to_string()))
    }

    async fn ping(&self) -> Result<(), BackendError> {
        Err(BackendError::Rejected("memory service offline".to_string()))
    }
}
