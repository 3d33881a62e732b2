//! HTTP route handlers.

pub mod parse;
pub mod sessions;
pub mod ws;

use crate::state::AppState;
use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use draftdeck_core::DraftdeckError;
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Map a core error onto the status code clients see.
pub fn error_response(e: DraftdeckError) -> (StatusCode, String) {
    let status = match &e {
        DraftdeckError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        DraftdeckError::InvalidWorkingDirectory(_) | DraftdeckError::SessionLimitExceeded(_) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

/// Full application router.
pub fn router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/sessions", get(sessions::list).post(sessions::create))
        .route("/sessions/{id}", get(sessions::get).delete(sessions::terminate))
        .route("/sessions/{id}/input", post(sessions::send_input))
        .route("/sessions/{id}/resize", post(sessions::resize))
        .route("/parse", post(parse::parse))
        .route("/health", get(health));

    let ws_routes = Router::new().route("/sessions/{id}", get(ws::upgrade));

    Router::new()
        .nest("/api", api_routes)
        .nest("/ws", ws_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (DraftdeckError::SessionNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (
                DraftdeckError::InvalidWorkingDirectory(PathBuf::from("/nope")),
                StatusCode::BAD_REQUEST,
            ),
            (DraftdeckError::SessionLimitExceeded(8), StatusCode::BAD_REQUEST),
            (
                DraftdeckError::PtyError("openpty failed".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error_response(error).0, expected);
        }
    }
}
