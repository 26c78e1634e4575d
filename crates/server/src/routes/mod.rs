use axum::{
    Router, middleware,
    routing::{IntoMakeService, get, post},
};
use tower_http::cors::CorsLayer;

use crate::{DeploymentImpl, middleware as app_middleware};

pub mod agents;
pub mod batch;
pub mod executions;
pub mod feedback;
pub mod health;
pub mod metrics;

#[cfg(test)]
mod routes_tests;

pub const API_PREFIX: &str = "/api/orchestrator";

/// Orchestrator endpoints, every one behind bearer auth.
pub fn orchestrator_routes(deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/execute", post(executions::execute))
        .route("/status/{id}", get(executions::get_status))
        .route("/result/{id}", get(executions::get_result))
        .route("/agents", get(agents::list_agents))
        .route("/capabilities", get(agents::list_capabilities))
        .route("/metrics", get(metrics::metrics_summary))
        .route("/metrics/prometheus", get(metrics::prometheus_metrics))
        .route("/feedback", post(feedback::submit_feedback))
        .route("/batch", post(batch::execute_batch))
        .layer(middleware::from_fn_with_state(
            deployment.clone(),
            app_middleware::require_auth,
        ))
}

pub fn api_router(deployment: DeploymentImpl) -> Router {
    Router::new()
        .nest(API_PREFIX, orchestrator_routes(&deployment))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(app_middleware::request_id_middleware))
        .with_state(deployment)
}

pub fn router(deployment: DeploymentImpl) -> IntoMakeService<Router> {
    api_router(deployment).into_make_service()
}
