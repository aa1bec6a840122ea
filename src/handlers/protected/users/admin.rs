use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::auth::cognito::{CognitoUser, UserAttribute};
use crate::error::ApiError;
use crate::handlers::public::auth::required;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAttributesRequest {
    #[serde(default)]
    pub attributes: Vec<UserAttribute>,
}

/// POST /api/users - Create a pool user without sending an invitation
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> ApiResult<CognitoUser> {
    let email = required(&body.email, "email")?;
    let name = required(&body.name, "name")?;
    let user = state.identity.admin_create_user(email, name).await?;
    info!("Created pool user {}", user.username);
    Ok(ApiResponse::created(user))
}

/// GET /api/users - All pool users
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<CognitoUser>> {
    Ok(ApiResponse::success(state.identity.list_users().await?))
}

/// GET /api/users/:username - One pool user
pub async fn show(State(state): State<AppState>, Path(username): Path<String>) -> ApiResult<CognitoUser> {
    Ok(ApiResponse::success(state.identity.admin_get_user(&username).await?))
}

/// PUT /api/users/:username - Replace the given attributes
pub async fn update(
    State(state): State<AppState>,
    Path(username): Path<String>,
    body: Option<Json<UpdateAttributesRequest>>,
) -> ApiResult<Value> {
    let Json(body) = body.unwrap_or_default();
    if body.attributes.is_empty() {
        return Err(ApiError::bad_request("attributes must be a non-empty array"));
    }
    state.identity.admin_update_attributes(&username, &body.attributes).await?;
    Ok(ApiResponse::success(json!({
        "message": format!("User {} updated successfully", username)
    })))
}

/// DELETE /api/users/:username - Remove a pool user
pub async fn delete(State(state): State<AppState>, Path(username): Path<String>) -> ApiResult<Value> {
    state.identity.admin_delete_user(&username).await?;
    info!("Deleted pool user {}", username);
    Ok(ApiResponse::success(json!({
        "message": format!("User {} deleted successfully", username)
    })))
}
