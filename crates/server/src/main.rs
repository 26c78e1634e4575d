use anyhow::{self, Error as AnyhowError};
use deployment::{Deployment, DeploymentError};
use server::{DeploymentImpl, routes};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, prelude::*};
use utils::sentry::{init_from_env, sentry_layer};

#[derive(Debug, Error)]
pub enum OrchestratorServerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

#[tokio::main]
async fn main() -> Result<(), OrchestratorServerError> {
    dotenv::dotenv().ok();
    let _sentry = init_from_env();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},services={level},deployment={level},local_deployment={level},utils={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string)
        .map_err(|e| anyhow::anyhow!("Failed to create tracing filter: {e}"))?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .with(sentry_layer())
        .init();

    let deployment = DeploymentImpl::new().await?;
    deployment.log_startup_health().await;

    let host = deployment.config().server.host.clone();
    let port = deployment.config().server.port;
    let app_router = routes::router(deployment);

    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    let actual_port = listener.local_addr()?.port();
    tracing::info!("Orchestrator running on http://{host}:{actual_port}");

    axum::serve(listener, app_router).await?;
    Ok(())
}
