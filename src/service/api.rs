use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::{debug, warn};

use super::dispatcher::{CompleteCommand, Dispatcher, ScopeCommand};
use super::models::{Credential, RepoSlug, SessionResponse};
use crate::errors::DispatchError;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub dispatcher: Dispatcher,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct IssuesQuery {
    pub repo: String,
    pub github_token: Credential,
}

#[derive(Deserialize)]
pub struct ScopeRequest {
    pub repo: String,
    pub issue_number: u64,
    pub github_token: Credential,
    pub devin_api_key: Credential,
}

#[derive(Deserialize)]
pub struct CompleteRequest {
    pub repo: String,
    pub issue_number: u64,
    pub github_token: Credential,
    pub devin_api_key: Credential,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Deserialize)]
pub struct SessionQuery {
    pub devin_api_key: Credential,
}

// ── Error handling ────────────────────────────────────────────────────

pub struct ApiError(DispatchError);

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        Self(err)
    }
}

/// HTTP status for each error class.
pub fn status_for(err: &DispatchError) -> StatusCode {
    match err {
        DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
        DispatchError::UpstreamAuth { .. } => StatusCode::UNAUTHORIZED,
        DispatchError::NotFound(_) => StatusCode::NOT_FOUND,
        DispatchError::UpstreamRejected { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        DispatchError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if self.0.is_upstream() {
            warn!(status = status.as_u16(), error = %self.0, "request failed upstream");
        } else {
            debug!(status = status.as_u16(), error = %self.0, "request rejected");
        }
        (status, Json(serde_json::json!({"error": self.0.to_string()}))).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/api/issues", get(list_issues))
        .route("/api/scope", post(scope_issue))
        .route("/api/complete", post(complete_issue))
        .route("/api/session/{session_id}", get(get_session))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn list_issues(
    State(state): State<SharedState>,
    Query(query): Query<IssuesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = RepoSlug::parse(&query.repo)?;
    let issues = state
        .dispatcher
        .list_issues(&repo, &query.github_token)
        .await?;
    Ok(Json(issues))
}

async fn scope_issue(
    State(state): State<SharedState>,
    Json(req): Json<ScopeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = ScopeCommand {
        repo: RepoSlug::parse(&req.repo)?,
        issue_number: req.issue_number,
        github_token: req.github_token,
        devin_api_key: req.devin_api_key,
    };
    let record = state.dispatcher.scope_issue(cmd).await?;
    Ok(Json(SessionResponse::from(record)))
}

async fn complete_issue(
    State(state): State<SharedState>,
    Json(req): Json<CompleteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cmd = CompleteCommand {
        repo: RepoSlug::parse(&req.repo)?,
        issue_number: req.issue_number,
        github_token: req.github_token,
        devin_api_key: req.devin_api_key,
        session_id: req.session_id,
    };
    let record = state.dispatcher.complete_issue(cmd).await?;
    Ok(Json(SessionResponse::from(record)))
}

async fn get_session(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    Query(query): Query<SessionQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state
        .dispatcher
        .refresh_session(&session_id, &query.devin_api_key)
        .await?;
    Ok(Json(SessionResponse::from(record)))
}
