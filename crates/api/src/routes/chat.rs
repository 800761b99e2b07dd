//! Chat endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::Value;

use crate::{chat::ChatReply, error::ApiResult, state::AppState, validation::validate_chat};

/// `POST /api/chat`. A failing backend degrades to the configured fallback reply.
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<ChatReply>> {
    let Json(body) = payload?;
    let request = validate_chat(&body)?;

    match state.chat.reply(&request).await {
        Ok(reply) => Ok(Json(reply)),
        Err(e) => {
            tracing::warn!(
                project_id = %request.project_id,
                error = %e,
                "Chat backend failed, sending fallback reply"
            );
            Ok(Json(ChatReply {
                reply: state.config.chat_fallback_reply.clone(),
            }))
        }
    }
}
