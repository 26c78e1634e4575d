use axum::{
    Extension,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json as ResponseJson,
};
use deployment::Deployment;
use serde::{Deserialize, Serialize};
use services::services::{
    orchestrator::Submission,
    unified::{
        AgentSelection, ExecutionRecord, ExecutionState, RequestContext, SystemKind,
        UnifiedRequest, UnifiedResponse,
    },
};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl, error::ApiError, middleware::AuthenticatedUser, orchestrator_metrics,
    routes::API_PREFIX,
};

/// Body of `POST /execute` and of each `POST /batch` item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteBody {
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub context: Option<RequestContext>,
    #[serde(default)]
    pub agent_selection: Option<AgentSelection>,
    #[serde(default)]
    pub agents: Option<Vec<String>>,
    /// Return 202 right away and run in the background.
    #[serde(default, rename = "async")]
    pub run_async: bool,
}

impl ExecuteBody {
    /// Bind the body to the authenticated caller. A `userId` naming anyone
    /// else is refused.
    pub fn into_request(self, user: &AuthenticatedUser) -> Result<UnifiedRequest, ApiError> {
        let user_id = match self.user_id {
            Some(id) if id != user.user_id => {
                return Err(ApiError::Forbidden(
                    "userId does not match the authenticated user".to_string(),
                ));
            }
            _ => user.user_id.clone(),
        };

        let has_agents = self.agents.as_ref().is_some_and(|a| !a.is_empty());
        let agent_selection = self.agent_selection.unwrap_or(if has_agents {
            AgentSelection::Manual
        } else {
            AgentSelection::Auto
        });

        Ok(UnifiedRequest {
            goal: self.goal,
            user_id,
            context: self.context,
            agent_selection,
            agents: self.agents,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLinks {
    pub status: String,
    pub result: String,
}

impl ExecutionLinks {
    pub fn for_execution(id: Uuid) -> Self {
        Self {
            status: format!("{API_PREFIX}/status/{id}"),
            result: format!("{API_PREFIX}/result/{id}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub execution_id: Uuid,
    pub status: ExecutionState,
    pub system_used: SystemKind,
    pub routing_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<UnifiedResponse>,
    pub links: ExecutionLinks,
}

pub(crate) async fn submit(
    deployment: &DeploymentImpl,
    body: ExecuteBody,
    user: &AuthenticatedUser,
) -> Result<Submission, ApiError> {
    let request = body.into_request(user)?;
    let submission = deployment.orchestrator().submit(request).await?;
    orchestrator_metrics::record_routing(submission.decision.system);
    Ok(submission)
}

pub(crate) async fn run_tracked(
    deployment: &DeploymentImpl,
    submission: Submission,
) -> UnifiedResponse {
    orchestrator_metrics::execution_started();
    let response = deployment.orchestrator().run(submission).await;
    orchestrator_metrics::record_execution(&response);
    response
}

pub async fn execute(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<ResponseJson<ExecuteBody>, JsonRejection>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<ExecuteResponse>>), ApiError> {
    let ResponseJson(body) = payload?;
    let run_async = body.run_async;
    let submission = submit(&deployment, body, &user).await?;
    let execution_id = submission.execution_id;
    let system_used = submission.decision.system;
    let routing_reason = submission.decision.reason.clone();
    let links = ExecutionLinks::for_execution(execution_id);

    if run_async {
        let background = deployment.clone();
        tokio::spawn(async move {
            run_tracked(&background, submission).await;
        });
        return Ok((
            StatusCode::ACCEPTED,
            ResponseJson(ApiResponse::success(ExecuteResponse {
                execution_id,
                status: ExecutionState::Queued,
                system_used,
                routing_reason,
                response: None,
                links,
            })),
        ));
    }

    let response = run_tracked(&deployment, submission).await;
    let status = response.status;
    let error = response.error.clone();
    let payload = ExecuteResponse {
        execution_id,
        status,
        system_used,
        routing_reason,
        response: Some(response),
        links,
    };

    match status {
        ExecutionState::Completed => {
            Ok((StatusCode::OK, ResponseJson(ApiResponse::success(payload))))
        }
        _ => Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            ResponseJson(ApiResponse::error_with_data(
                error.as_deref().unwrap_or("Execution failed"),
                payload,
            )),
        )),
    }
}

/// Ids that are not UUIDs can never name a record.
fn parse_execution_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("Execution {raw} not found")))
}

/// Current state of an execution, without its result payload.
pub async fn get_status(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<ResponseJson<ApiResponse<ExecutionRecord>>, ApiError> {
    let id = parse_execution_id(&id)?;
    let record = deployment.orchestrator().status(id, &user.user_id).await?;
    Ok(ResponseJson(ApiResponse::success(record)))
}

/// The full record: 200 once terminal, 202 while still queued or running.
pub async fn get_result(
    State(deployment): State<DeploymentImpl>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<ExecutionRecord>>), ApiError> {
    let id = parse_execution_id(&id)?;
    let record = deployment.orchestrator().result(id, &user.user_id).await?;
    let status = if record.state.is_terminal() {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    Ok((status, ResponseJson(ApiResponse::success(record))))
}
