use std::sync::Arc;

use anyhow::Error as AnyhowError;
use async_trait::async_trait;
use services::services::{
    auth::AuthService,
    config::{ConfigError, OrchestratorConfig},
    execution_store::ExecutionCounts,
    orchestrator::UnifiedOrchestrator,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

/// Everything a route handler needs, shared as axum state.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn config(&self) -> &Arc<OrchestratorConfig>;

    fn orchestrator(&self) -> &Arc<UnifiedOrchestrator>;

    fn auth(&self) -> &AuthService;

    /// Log the state of both backend systems once at startup.
    async fn log_startup_health(&self) {
        let health = self.orchestrator().health().await;
        for system in &health.systems {
            match &system.detail {
                Some(detail) => tracing::warn!(
                    "{} system is {} ({} agents): {}",
                    system.system,
                    system.status,
                    system.agent_count,
                    detail
                ),
                None => tracing::info!(
                    "{} system is {} ({} agents)",
                    system.system,
                    system.status,
                    system.agent_count
                ),
            }
        }
    }

    async fn execution_counts(&self) -> ExecutionCounts {
        self.orchestrator().execution_counts().await
    }
}
