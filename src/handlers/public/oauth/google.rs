use axum::{
    extract::{Query, State},
    response::Redirect,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::CallbackQuery;
use crate::auth::oauth::GoogleProfile;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct GoogleLogin {
    pub user: GoogleProfile,
}

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfoRequest {
    #[serde(default)]
    pub access_token: String,
}

/// GET /auth/google - Redirect to the Google consent screen
pub async fn redirect(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    Ok(Redirect::temporary(&state.oauth.google_authorize_url()?))
}

/// GET /auth/google/callback - Exchange the code and return the Google profile
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<GoogleLogin> {
    let user = state.oauth.google_callback(query.code.trim()).await?;
    Ok(ApiResponse::success(GoogleLogin { user }))
}

/// POST /auth/google/login - Exchange a hosted-UI authorization code for Cognito tokens
pub async fn login(State(state): State<AppState>, Json(body): Json<CodeRequest>) -> ApiResult<Value> {
    let tokens = state.oauth.cognito_exchange_code(body.code.trim()).await?;
    Ok(ApiResponse::success(tokens))
}

/// POST /auth/google/userinfo - Claims of a hosted-UI access token
pub async fn userinfo(State(state): State<AppState>, Json(body): Json<UserInfoRequest>) -> ApiResult<Value> {
    let token = body.access_token.trim();
    if token.is_empty() {
        return Err(ApiError::bad_request("accessToken is required"));
    }
    let info = state.oauth.cognito_user_info(token).await?;
    Ok(ApiResponse::success(info))
}
