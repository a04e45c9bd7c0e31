//! Session inspection endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};

use crate::server::GatewayState;

/// Handler for `GET /api/sessions/:id`.
pub async fn get_session(
    State(state): State<GatewayState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let turns = state
        .relay
        .store()
        .snapshot(&session_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(json!({
        "session_id": session_id,
        "turns": turns,
    })))
}

/// Handler for `DELETE /api/sessions/:id`.
pub async fn delete_session(
    State(state): State<GatewayState>,
    Path(session_id): Path<String>,
) -> StatusCode {
    if state.relay.store().remove(&session_id) {
        tracing::info!(session_id = %session_id, "Session deleted");
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
