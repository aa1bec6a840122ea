use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::DatabaseError;
use crate::state::AppState;

/// GET / - Service name, version and route overview
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Board API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "auth": "/auth/* (public, except admin and api-keys)",
                "users": "/api/users (protected)",
                "files": "/file/* (protected)",
                "dynamodb": "/api/dynamodb/* (protected)",
                "swingers": "/swingers (protected)",
                "prisma": "/api/prisma (protected)",
                "chatgpt": "/api/chatgpt/ask (protected)",
                "gemini": "/google-gemini/* (protected)",
                "log": "/log, /log/history (protected)",
                "websocket": "/ws (token required), /websocket/status"
            }
        }
    }))
}

/// GET /health - Liveness plus database reachability
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        // Without DATABASE_URL the service still serves everything except the relational routes
        Err(DatabaseError::ConfigMissing(_)) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "not configured" }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": true,
                "message": "database unavailable",
                "code": "SERVICE_UNAVAILABLE",
                "data": { "status": "degraded", "timestamp": now, "database_error": e.to_string() }
            })),
        ),
    }
}

/// GET /websocket/status - Gateway liveness
pub async fn websocket_status() -> Json<Value> {
    Json(json!({ "status": "WebSocket server running" }))
}
