use axum::{extract::State, Json};
use serde::Deserialize;

use super::required;
use crate::auth::cognito::AuthTokens;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /auth/refresh-token - Trade a refresh token for fresh access and id tokens
pub async fn refresh_post(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> ApiResult<AuthTokens> {
    let refresh_token = required(&body.refresh_token, "refreshToken")?;
    let tokens = state.identity.refresh(refresh_token).await?;
    Ok(ApiResponse::success(tokens))
}
