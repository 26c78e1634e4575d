use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use deployment::Deployment;

use crate::{DeploymentImpl, error::ApiError};

/// Identity taken from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: Option<String>,
}

/// Reject requests without a valid bearer token; otherwise make the caller
/// available to handlers as an `Extension<AuthenticatedUser>`.
pub async fn require_auth(
    State(deployment): State<DeploymentImpl>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let claims = deployment.auth().verify_header(auth_header)?;
    req.extensions_mut().insert(AuthenticatedUser {
        user_id: claims.sub,
        email: claims.email,
    });
    Ok(next.run(req).await)
}
