use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{ChatMessage, UserProfile};
use crate::services::conversation;
use crate::state::AppState;

const MAX_CONVERSATION_ID_LEN: usize = 128;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub conversation_id: Option<String>,
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub conversation_id: String,
    pub reply: String,
}

// POST /api/chat
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let conversation_id = payload
        .conversation_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    if conversation_id.len() > MAX_CONVERSATION_ID_LEN {
        return Err(AppError::BadRequest("conversation_id is too long".to_string()));
    }

    let reply = conversation::process_message(&state, &conversation_id, &payload.message).await?;

    Ok(Json(ChatResponse {
        conversation_id,
        reply,
    }))
}

#[derive(Serialize)]
pub struct ConversationResponse {
    conversation_id: String,
    profile: UserProfile,
    pending_operation: String,
    operation_context: BTreeMap<String, String>,
    awaiting_clarification: bool,
    messages: Vec<ChatMessage>,
}

// GET /api/chat/:id
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, AppError> {
    let session = conversation::snapshot(&state, &id)?
        .ok_or_else(|| AppError::NotFound(format!("conversation {id}")))?;

    Ok(Json(ConversationResponse {
        conversation_id: session.conversation_id,
        pending_operation: session.state.pending_operation().as_str().to_string(),
        operation_context: session.state.context().clone(),
        awaiting_clarification: session.state.awaiting_clarification(),
        messages: session.history.messages().to_vec(),
        profile: session.profile,
    }))
}

// POST /api/chat/:id/reset
pub async fn reset_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let removed = conversation::reset(&state, &id)?;
    Ok(Json(serde_json::json!({ "ok": true, "removed": removed })))
}
