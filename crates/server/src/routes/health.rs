use axum::{extract::State, response::Json as ResponseJson};
use deployment::Deployment;
use services::services::orchestrator::OrchestratorHealth;
use utils::response::ApiResponse;

use crate::DeploymentImpl;

pub async fn health_check(
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<OrchestratorHealth>> {
    let health = deployment.orchestrator().health().await;
    ResponseJson(ApiResponse::success(health))
}
