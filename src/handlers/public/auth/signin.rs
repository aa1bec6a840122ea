use axum::{extract::State, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use tracing::info;

use super::required;
use crate::auth::cognito::AuthTokens;
use crate::config::SecurityConfig;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ACCESS_TOKEN_COOKIE};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/signin - Password login; the access token is also set as an HttpOnly cookie
pub async fn signin_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<SignInRequest>,
) -> Result<(CookieJar, ApiResponse<AuthTokens>), ApiError> {
    let email = required(&body.email, "email")?;
    let password = required(&body.password, "password")?;

    let tokens = state.identity.sign_in(email, password).await?;
    info!("Signed in {}", email);

    let jar = match tokens.access_token.clone() {
        Some(token) => jar.add(access_cookie(token, &state.config.security)),
        None => jar,
    };
    Ok((jar, ApiResponse::success(tokens)))
}

pub(crate) fn access_cookie(token: String, security: &SecurityConfig) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(security.cookie_secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::hours(security.cookie_max_age_hours))
        .build()
}
