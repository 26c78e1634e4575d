use axum::{extract::State, response::Json as ResponseJson};
use deployment::Deployment;
use services::services::{adapters::AgentCapability, orchestrator::AgentCatalog};
use utils::response::ApiResponse;

use crate::DeploymentImpl;

/// Agent names across both systems, de-duplicated.
pub async fn list_agents(
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<AgentCatalog>> {
    ResponseJson(ApiResponse::success(
        deployment.orchestrator().available_agents().await,
    ))
}

pub async fn list_capabilities(
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<Vec<AgentCapability>>> {
    ResponseJson(ApiResponse::success(
        deployment.orchestrator().capabilities().await,
    ))
}
