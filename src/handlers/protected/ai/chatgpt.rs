use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct Answer {
    pub answer: String,
}

/// POST /api/chatgpt/ask - Single-turn question to the chat completions API
pub async fn ask_post(State(state): State<AppState>, Json(body): Json<AskRequest>) -> ApiResult<Answer> {
    let answer = state.chatgpt.ask(body.question.trim()).await?;
    Ok(ApiResponse::success(Answer { answer }))
}
