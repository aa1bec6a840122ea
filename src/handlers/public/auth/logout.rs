use axum::{extract::State, http::HeaderMap};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::middleware::auth::bearer_token;
use crate::middleware::{ApiResponse, ACCESS_TOKEN_COOKIE};
use crate::state::AppState;

/// POST /auth/logout - Revoke every session of the token's user and clear the cookie
pub async fn logout_post(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Result<(CookieJar, ApiResponse<Value>), ApiError> {
    let token = jar
        .get(ACCESS_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(&headers))
        .ok_or_else(|| ApiError::bad_request("Access token is required"))?;

    if let Err(e) = state.identity.global_sign_out(&token).await {
        warn!("Global sign-out failed: {}", e);
        return Err(ApiError::unauthorized("Invalid or expired access token"));
    }
    info!("Signed out session");

    let jar = jar.remove(Cookie::build(ACCESS_TOKEN_COOKIE).path("/"));
    Ok((jar, ApiResponse::success(json!({ "message": "Logged out successfully" }))))
}
