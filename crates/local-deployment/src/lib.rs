use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use deployment::{Deployment, DeploymentError};
use services::services::{
    adapters::{GraphAdapter, LegacyAdapter},
    auth::AuthService,
    backends::{
        HttpJobQueue, HttpLegacyBackend, HttpMemoryService, LocalMemoryService, MemoryService,
        StaticAgentRegistry,
    },
    config::OrchestratorConfig,
    execution_store::{ExecutionStore, ExpiringExecutionStore, InMemoryExecutionStore},
    orchestrator::UnifiedOrchestrator,
};

const BACKEND_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<OrchestratorConfig>,
    orchestrator: Arc<UnifiedOrchestrator>,
    auth: AuthService,
}

impl LocalDeployment {
    /// Wire both agent systems from a loaded config.
    pub fn from_config(config: OrchestratorConfig) -> Result<Self, DeploymentError> {
        let client = reqwest::Client::builder()
            .timeout(BACKEND_TIMEOUT)
            .build()
            .map_err(anyhow::Error::from)?;

        let legacy = LegacyAdapter::new(
            Arc::new(StaticAgentRegistry::new(config.legacy.agents.clone())),
            Arc::new(HttpLegacyBackend::new(
                client.clone(),
                config.legacy.base_url.clone(),
            )),
        );

        let memory: Arc<dyn MemoryService> = match &config.graph.memory_url {
            Some(url) => {
                tracing::info!("Graph memory served by {}", url);
                Arc::new(HttpMemoryService::new(
                    client.clone(),
                    url.clone(),
                    config.graph.memory_ttl(),
                ))
            }
            None => Arc::new(LocalMemoryService::new(
                config.graph.memory_capacity,
                config.graph.memory_ttl(),
            )),
        };
        let graph = GraphAdapter::new(
            Arc::new(StaticAgentRegistry::new(config.graph.agents.clone())),
            Arc::new(HttpJobQueue::new(client, config.graph.job_queue_url.clone())),
            memory,
            config.graph.poll_interval(),
        );

        let store: Arc<dyn ExecutionStore> = match config.executions.ttl_secs {
            Some(ttl) => {
                tracing::info!("Execution records expire after {}s", ttl);
                Arc::new(ExpiringExecutionStore::new(
                    config.executions.max_entries,
                    Duration::from_secs(ttl),
                ))
            }
            None => Arc::new(InMemoryExecutionStore::new()),
        };

        let orchestrator = UnifiedOrchestrator::new(
            Arc::new(legacy),
            Arc::new(graph),
            store,
            config.routing.clone(),
        );

        Ok(Self::from_parts(config, Arc::new(orchestrator)))
    }

    /// Assemble a deployment around an already-built orchestrator.
    pub fn from_parts(config: OrchestratorConfig, orchestrator: Arc<UnifiedOrchestrator>) -> Self {
        let auth = AuthService::new(&config.auth.jwt_secret);
        Self {
            config: Arc::new(config),
            orchestrator,
            auth,
        }
    }
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        let config = OrchestratorConfig::from_env()?;
        tracing::info!(
            "Legacy agents at {}, graph job queue at {}",
            config.legacy.base_url,
            config.graph.job_queue_url
        );
        Self::from_config(config)
    }

    fn config(&self) -> &Arc<OrchestratorConfig> {
        &self.config
    }

    fn orchestrator(&self) -> &Arc<UnifiedOrchestrator> {
        &self.orchestrator
    }

    fn auth(&self) -> &AuthService {
        &self.auth
    }
}
