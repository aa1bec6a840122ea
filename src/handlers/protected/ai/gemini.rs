use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::database::models::{ChatMessage, ChatRole};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::ai::gemini::first_prompt;
use crate::state::AppState;

/// Chat owner recorded when the caller has no username
const GUEST: &str = "guest";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedInput {
    pub chat_id: Uuid,
    pub question: String,
    pub answer: String,
}

/// POST /google-gemini/generate-content - Forward a generateContent body, return Gemini's response as is
pub async fn generate_content_post(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.gemini.generate_content(&body).await?))
}

/// POST /google-gemini/process-input - Answer the first prompt and record both sides of the chat
pub async fn process_input_post(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(body): Json<Value>,
) -> ApiResult<ProcessedInput> {
    let question = first_prompt(&body)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("contents[0].parts[0].text is required"))?
        .to_string();
    let user = if caller.username.is_empty() {
        GUEST
    } else {
        caller.username.as_str()
    };

    let chat_id = Uuid::new_v4();
    let answer = state.gemini.answer(&question).await?;

    state.chats.append(chat_id, user, ChatRole::User, &question).await?;
    state.chats.append(chat_id, user, ChatRole::Model, &answer).await?;
    info!("Recorded Gemini chat {} for {}", chat_id, user);

    Ok(ApiResponse::success(ProcessedInput {
        chat_id,
        question,
        answer,
    }))
}

/// GET /google-gemini/chats/:chat_id - Recorded messages of one chat, oldest first
pub async fn chat_history(State(state): State<AppState>, Path(chat_id): Path<Uuid>) -> ApiResult<Vec<ChatMessage>> {
    let messages = state.chats.history(chat_id).await?;
    if messages.is_empty() {
        return Err(ApiError::not_found(format!("Chat {} not found", chat_id)));
    }
    Ok(ApiResponse::success(messages))
}
