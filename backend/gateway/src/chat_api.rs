//! Chat relay endpoint (`POST /chat`).

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tracing::info;

use manasik_core::Turn;

use crate::server::GatewayState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub messages: Vec<Turn>,
    #[serde(default)]
    pub reset_session: bool,
}

/// Body of every `/chat` answer: `{"response": ...}` or `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatReply {
    Response { response: String },
    Error { error: String },
}

/// Handler for `POST /chat`.
///
/// Relay failures are reported in the body with transport status 200, which
/// existing clients depend on.
pub async fn chat(
    State(state): State<GatewayState>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatReply> {
    info!(
        session_id = %request.session_id,
        turns = request.messages.len(),
        reset = request.reset_session,
        "Chat request"
    );

    let reply = match state
        .relay
        .handle(&request.session_id, request.messages, request.reset_session)
        .await
    {
        Ok(response) => ChatReply::Response { response },
        Err(e) => ChatReply::Error {
            error: e.to_string(),
        },
    };

    Json(reply)
}
