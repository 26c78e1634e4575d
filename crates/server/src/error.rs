use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use deployment::DeploymentError;
use services::services::{
    auth::AuthError, orchestrator::OrchestratorError, unified::FieldError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Deployment(#[from] DeploymentError),
    #[error(transparent)]
    Json(#[from] JsonRejection),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::Orchestrator(err) => match err {
                OrchestratorError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
                OrchestratorError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
                OrchestratorError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden"),
                OrchestratorError::Routing(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "RoutingError")
                }
                OrchestratorError::InvalidTransition { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "OrchestratorError")
                }
            },
            ApiError::Auth(_) => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            ApiError::Deployment(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DeploymentError"),
            // Syntax and type errors alike are a bad request body.
            ApiError::Json(_) => (StatusCode::BAD_REQUEST, "InvalidBody"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequest"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound"),
            ApiError::InternalError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
        };

        if status_code.is_server_error() {
            tracing::error!("{} ({}): {}", error_type, status_code, self);
        } else {
            tracing::debug!("{} ({}): {}", error_type, status_code, self);
        }

        let message = match &self {
            ApiError::Auth(_) => "Missing or invalid bearer token".to_string(),
            ApiError::Json(rejection) => rejection.body_text(),
            _ => self.to_string(),
        };

        match self {
            ApiError::Orchestrator(OrchestratorError::Validation(errors)) => {
                let response = ApiResponse::<(), Vec<FieldError>>::error_with_data(
                    "Request validation failed",
                    errors,
                );
                (status_code, Json(response)).into_response()
            }
            _ => {
                let response = ApiResponse::<()>::error(&message);
                (status_code, Json(response)).into_response()
            }
        }
    }
}
