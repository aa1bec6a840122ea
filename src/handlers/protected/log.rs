// handlers/protected/log.rs - Client log relay into the server's tracing output

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::log_history::{LogEntry, LogLevel};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LogRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub level: String,
}

/// POST /log - Emit a message at info, warn or error
pub async fn log_post(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(body): Json<LogRequest>,
) -> ApiResult<Value> {
    let level: LogLevel = body.level.parse().map_err(ApiError::bad_request)?;
    if body.message.trim().is_empty() {
        return Err(ApiError::bad_request("message is required"));
    }

    match level {
        LogLevel::Info => info!(target: "client", user = %caller.username, "{}", body.message),
        LogLevel::Warn => warn!(target: "client", user = %caller.username, "{}", body.message),
        LogLevel::Error => error!(target: "client", user = %caller.username, "{}", body.message),
    }

    state.log_history.push(LogEntry {
        timestamp: Utc::now(),
        level,
        message: body.message,
        user: caller.username,
    });

    Ok(ApiResponse::success(json!({ "status": "Logged", "level": level })))
}

/// GET /log/history - Recently relayed messages, oldest first
pub async fn history(State(state): State<AppState>) -> ApiResult<Value> {
    let entries = state.log_history.recent();
    if entries.is_empty() {
        return Ok(ApiResponse::success(json!({ "message": "No logs available" })));
    }
    Ok(ApiResponse::success(json!(entries)))
}
