//! HTTP API routes: code runner proxy, group listing, session lookup.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::ErrorCode;
use crate::services::executor::{CodeOutcome, CodeRequest, ExecAction, ExecError};
use crate::services::registry::RoomSummary;
use crate::services::room::RoomError;
use crate::state::{AppState, Language, RoomKey, RoomKind};

#[derive(Debug, Deserialize)]
pub struct CreateGroupBody {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedGroup {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: String,
    pub language: Language,
    pub participants: usize,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

// =============================================================================
// CODE RUNNER
// =============================================================================

/// `POST /api/run`: Execute code through the configured runner.
pub async fn run_code(State(state): State<AppState>, body: Result<Json<CodeRequest>, JsonRejection>) -> Response {
    match body {
        Ok(Json(req)) => execute(&state, ExecAction::Run, &req).await,
        Err(rejection) => reject_body(ExecAction::Run, &rejection),
    }
}

/// `POST /api/analyze`: Static analysis through the configured analyzer.
pub async fn analyze_code(State(state): State<AppState>, body: Result<Json<CodeRequest>, JsonRejection>) -> Response {
    match body {
        Ok(Json(req)) => execute(&state, ExecAction::Analyze, &req).await,
        Err(rejection) => reject_body(ExecAction::Analyze, &rejection),
    }
}

/// Body errors answer in the same `{success, output}` shape the client parses.
fn reject_body(action: ExecAction, rejection: &JsonRejection) -> Response {
    warn!(action = action.as_str(), error = %rejection, "api: invalid code request body");
    (rejection.status(), Json(CodeOutcome::failure(rejection.body_text()))).into_response()
}

async fn execute(state: &AppState, action: ExecAction, req: &CodeRequest) -> Response {
    if req.code.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(CodeOutcome::failure("No code provided"))).into_response();
    }
    let Some(executor) = state.executor.as_ref() else {
        let err = ExecError::NotConfigured(action.as_str());
        return (exec_error_to_status(&err), Json(CodeOutcome::failure(err.to_string()))).into_response();
    };

    match executor.execute(action, req).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e) => {
            error!(
                action = action.as_str(),
                code = e.error_code(),
                retryable = e.retryable(),
                error = %e,
                "code executor failed"
            );
            (exec_error_to_status(&e), Json(CodeOutcome::failure(e.to_string()))).into_response()
        }
    }
}

fn exec_error_to_status(err: &ExecError) -> StatusCode {
    match err {
        ExecError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        ExecError::Request(_) | ExecError::Status { .. } | ExecError::Decode(_) => StatusCode::BAD_GATEWAY,
    }
}

// =============================================================================
// ROOMS
// =============================================================================

/// `GET /api/groups`: Live study groups sorted by id.
pub async fn list_groups(State(state): State<AppState>) -> Json<Vec<RoomSummary>> {
    Json(state.rooms.list(RoomKind::StudyGroup).await)
}

/// `POST /api/groups`: Create a named study group.
pub async fn create_group(
    State(state): State<AppState>,
    Json(body): Json<CreateGroupBody>,
) -> (StatusCode, Json<CreatedGroup>) {
    let (id, name) = state.rooms.create_group(body.name.as_deref()).await;
    info!(%id, %name, "api: study group created");
    (StatusCode::CREATED, Json(CreatedGroup { id, name }))
}

/// `GET /api/sessions/{id}`: Current language and head count of a pair session.
pub async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<SessionInfo>, Response> {
    let room = state
        .rooms
        .get(&RoomKey::pair(id.as_str()))
        .await
        .map_err(|e| not_found(&e))?;
    let room = room.lock().await;
    Ok(Json(SessionInfo { id, language: room.language, participants: room.participants.len() }))
}

/// Registry lookups only fail with `NotFound`.
fn not_found(err: &RoomError) -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorBody { code: err.error_code(), message: err.to_string() })).into_response()
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
