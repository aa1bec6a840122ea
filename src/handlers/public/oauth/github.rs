use axum::{
    extract::{Query, State},
    response::Redirect,
};

use super::CallbackQuery;
use crate::auth::oauth::GithubLogin;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /auth/github - Redirect to GitHub authorization
pub async fn redirect(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    Ok(Redirect::temporary(&state.oauth.github_authorize_url()?))
}

/// GET /auth/github/callback - Exchange the code and return the GitHub profile
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<GithubLogin> {
    let login = state.oauth.github_callback(query.code.trim()).await?;
    Ok(ApiResponse::success(login))
}
