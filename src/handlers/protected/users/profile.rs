use axum::extract::State;
use tracing::debug;

use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// Local user row for the caller. Token identities are created on first sight and
/// refreshed afterwards; API-key callers already carry their row id.
pub async fn local_user(state: &AppState, caller: &AuthUser) -> Result<User, ApiError> {
    if let Some(id) = caller.local_id {
        return state
            .users
            .find(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("User {} not found", id)));
    }

    let user = state
        .users
        .upsert_identity(&caller.id, &caller.username, caller.email.as_deref(), &caller.provider)
        .await?;
    debug!("Resolved local user {} for {}", user.id, caller.id);
    Ok(user)
}

/// GET /api/users/me - The caller's local user, created on first call
pub async fn me(State(state): State<AppState>, caller: AuthUser) -> ApiResult<User> {
    Ok(ApiResponse::success(local_user(&state, &caller).await?))
}
