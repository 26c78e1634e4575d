use axum::{
    Extension,
    extract::{State, rejection::JsonRejection},
    response::Json as ResponseJson,
};
use deployment::Deployment;
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl, error::ApiError, middleware::AuthenticatedUser, orchestrator_metrics,
};

pub const MAX_COMMENT_LENGTH: usize = 2000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackBody {
    pub execution_id: Option<Uuid>,
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Feedback is logged and counted, never stored.
pub async fn submit_feedback(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<ResponseJson<FeedbackBody>, JsonRejection>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let ResponseJson(body) = payload?;
    let rating = u8::try_from(body.rating)
        .ok()
        .filter(|r| (1..=5).contains(r))
        .ok_or_else(|| ApiError::BadRequest("rating must be between 1 and 5".to_string()))?;
    if body
        .comment
        .as_ref()
        .is_some_and(|c| c.chars().count() > MAX_COMMENT_LENGTH)
    {
        return Err(ApiError::BadRequest(format!(
            "comment must be at most {MAX_COMMENT_LENGTH} characters"
        )));
    }
    if let Some(id) = body.execution_id {
        deployment.orchestrator().status(id, &user.user_id).await?;
    }

    tracing::info!(
        "Feedback from {} on {}: rating {}{}",
        user.user_id,
        body.execution_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "orchestrator".to_string()),
        rating,
        body.comment
            .as_deref()
            .map(|c| format!(", comment: {c}"))
            .unwrap_or_default()
    );
    orchestrator_metrics::record_feedback(rating);

    Ok(ResponseJson(ApiResponse::success_with_message(
        (),
        "Feedback recorded",
    )))
}
