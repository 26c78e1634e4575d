use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Json as ResponseJson},
};
use deployment::Deployment;
use serde::Serialize;
use services::services::execution_store::ExecutionCounts;
use utils::response::ApiResponse;

use crate::{
    DeploymentImpl,
    orchestrator_metrics::{self, MetricsSummary},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsView {
    #[serde(flatten)]
    pub summary: MetricsSummary,
    pub executions: ExecutionCounts,
}

pub async fn metrics_summary(
    State(deployment): State<DeploymentImpl>,
) -> ResponseJson<ApiResponse<MetricsView>> {
    ResponseJson(ApiResponse::success(MetricsView {
        summary: orchestrator_metrics::summary(),
        executions: deployment.execution_counts().await,
    }))
}

pub async fn prometheus_metrics() -> impl IntoResponse {
    match orchestrator_metrics::export_metrics() {
        Ok(metrics) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            metrics,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to export metrics: {}", e),
        )
            .into_response(),
    }
}
