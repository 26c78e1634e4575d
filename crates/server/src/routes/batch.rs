use axum::{
    Extension,
    extract::{State, rejection::JsonRejection},
    response::Json as ResponseJson,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use services::services::unified::{ExecutionState, UnifiedResponse};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    middleware::AuthenticatedUser,
    orchestrator_metrics,
    routes::executions::{ExecuteBody, run_tracked, submit},
};

pub const MAX_BATCH_SIZE: usize = 10;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchBody {
    pub requests: Vec<ExecuteBody>,
    #[serde(default)]
    pub parallel: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<UnifiedResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub parallel: bool,
    pub results: Vec<BatchItemResult>,
}

async fn run_item(
    deployment: &DeploymentImpl,
    user: &AuthenticatedUser,
    index: usize,
    body: ExecuteBody,
) -> BatchItemResult {
    let submission = match submit(deployment, body, user).await {
        Ok(submission) => submission,
        Err(e) => {
            return BatchItemResult {
                index,
                success: false,
                execution_id: None,
                response: None,
                error: Some(e.to_string()),
            };
        }
    };
    let execution_id = submission.execution_id;
    let response = run_tracked(deployment, submission).await;
    BatchItemResult {
        index,
        success: response.status == ExecutionState::Completed,
        execution_id: Some(execution_id),
        error: response.error.clone(),
        response: Some(response),
    }
}

/// Run up to ten requests, one after another or all at once. Each item
/// reports its own outcome; the `async` flag of an item is ignored.
pub async fn execute_batch(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<ResponseJson<BatchBody>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<BatchResponse>>, ApiError> {
    let ResponseJson(body) = payload?;
    if body.requests.is_empty() || body.requests.len() > MAX_BATCH_SIZE {
        return Err(ApiError::BadRequest(format!(
            "a batch must contain between 1 and {MAX_BATCH_SIZE} requests, got {}",
            body.requests.len()
        )));
    }
    orchestrator_metrics::record_batch(body.parallel);

    let items = body.requests.into_iter().enumerate();
    let results = if body.parallel {
        join_all(items.map(|(index, item)| run_item(&deployment, &user, index, item))).await
    } else {
        let mut results = Vec::with_capacity(items.len());
        for (index, item) in items {
            results.push(run_item(&deployment, &user, index, item).await);
        }
        results
    };

    let succeeded = results.iter().filter(|r| r.success).count();
    tracing::info!(
        "Batch from {} finished: {}/{} succeeded ({})",
        user.user_id,
        succeeded,
        results.len(),
        if body.parallel { "parallel" } else { "sequential" }
    );

    Ok(ResponseJson(ApiResponse::success(BatchResponse {
        total: results.len(),
        succeeded,
        failed: results.len() - succeeded,
        parallel: body.parallel,
        results,
    })))
}
