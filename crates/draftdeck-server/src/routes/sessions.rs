//! Session management routes.

use super::error_response;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use draftdeck_core::CreateSessionOptions;
use draftdeck_types::{SessionSummary, TerminalSession};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionSummary>,
    pub active_count: usize,
}

pub async fn list(State(state): State<Arc<AppState>>) -> Json<SessionListResponse> {
    Json(SessionListResponse {
        sessions: state.session_manager.list_sessions(),
        active_count: state.session_manager.active_count(),
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub command: Option<PathBuf>,
    #[serde(default)]
    pub args: Option<Vec<String>>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub rows: Option<u16>,
    #[serde(default)]
    pub cols: Option<u16>,
}

#[derive(Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub ws_url: String,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, (StatusCode, String)> {
    let session = state
        .session_manager
        .create_session(CreateSessionOptions {
            command: req.command,
            args: req.args,
            cwd: req.cwd,
            rows: req.rows,
            cols: req.cols,
        })
        .await
        .map_err(error_response)?;

    info!(target: "draftdeck::api", "Created session {} running {:?}", session.id, session.command);

    Ok(Json(CreateSessionResponse {
        session_id: session.id,
        ws_url: format!("/ws/sessions/{}", session.id),
    }))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TerminalSession>, (StatusCode, String)> {
    state
        .session_manager
        .get_session(id)
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Session not found".to_string()))
}

pub async fn terminate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .session_manager
        .terminate_session(id)
        .await
        .map_err(error_response)?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct SendInputRequest {
    pub content: String,
}

pub async fn send_input(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SendInputRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .session_manager
        .send_input(id, &req.content)
        .await
        .map_err(error_response)?;

    Ok(StatusCode::OK)
}

#[derive(Deserialize)]
pub struct ResizeRequest {
    pub rows: u16,
    pub cols: u16,
}

pub async fn resize(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResizeRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .session_manager
        .resize(id, req.rows, req.cols)
        .await
        .map_err(error_response)?;

    Ok(StatusCode::OK)
}
