//! Stateless parse preview.

use axum::Json;
use draftdeck_types::ParsedEvent;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Deserialize)]
pub struct ParseRequest {
    pub text: String,
    /// Feed the text in chunks of this many bytes; 0 or absent means one chunk.
    #[serde(default)]
    pub chunk_size: Option<usize>,
}

#[derive(Serialize)]
pub struct ParseResponse {
    pub events: Vec<ParsedEvent>,
}

pub async fn parse(Json(req): Json<ParseRequest>) -> Json<ParseResponse> {
    let events = draftdeck_core::replay(&req.text, req.chunk_size.unwrap_or(0));
    debug!(target: "draftdeck::api", "Parse preview produced {} events", events.len());
    Json(ParseResponse { events })
}
