use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::auth::api_key;
use crate::database::models::ApiKey;
use crate::error::ApiError;
use crate::handlers::protected::users::local_user;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateKeyRequest {
    #[serde(default)]
    pub label: Option<String>,
}

/// Returned once at creation; only the hash is stored
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedKey {
    pub id: Uuid,
    pub key: String,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// POST /auth/api-keys - Issue a key for the calling token user
pub async fn create(
    State(state): State<AppState>,
    caller: AuthUser,
    body: Option<Json<CreateKeyRequest>>,
) -> ApiResult<CreatedKey> {
    if caller.is_api_key() {
        return Err(ApiError::forbidden("API keys can only be issued to token-authenticated users"));
    }
    let Json(body) = body.unwrap_or_default();
    let label = body.label.as_deref().map(str::trim).filter(|l| !l.is_empty());

    let owner = local_user(&state, &caller).await?;
    let issued = api_key::issue();
    let stored = state.api_keys.insert(owner.id, &issued.hash, label).await?;
    info!("Issued API key {} for {}", stored.id, owner.username);

    Ok(ApiResponse::created(CreatedKey {
        id: stored.id,
        key: issued.secret,
        label: stored.label,
        created_at: stored.created_at,
    }))
}

/// GET /auth/api-keys - Keys owned by the caller, without secrets
pub async fn list(State(state): State<AppState>, caller: AuthUser) -> ApiResult<Vec<ApiKey>> {
    let owner = local_user(&state, &caller).await?;
    Ok(ApiResponse::success(state.api_keys.list_for_user(owner.id).await?))
}

/// DELETE /auth/api-keys/:id - Revoke one of the caller's keys
pub async fn revoke(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Value> {
    let owner = local_user(&state, &caller).await?;
    state.api_keys.delete(owner.id, id).await?;
    info!("Revoked API key {} for {}", id, owner.username);
    Ok(ApiResponse::success(json!({ "message": "API key revoked" })))
}
