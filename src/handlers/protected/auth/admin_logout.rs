use axum::extract::{Path, State};
use serde_json::{json, Value};
use tracing::info;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// POST /auth/admin/logout/:username - Sign a user out of every device
pub async fn admin_logout_post(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(username): Path<String>,
) -> ApiResult<Value> {
    state.identity.admin_sign_out(&username).await?;
    info!("{} signed out {} globally", caller.username, username);
    Ok(ApiResponse::success(json!({
        "message": format!("User {} logged out successfully", username)
    })))
}
