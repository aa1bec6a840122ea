use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::info;

use super::required;
use crate::auth::cognito::SignUpOutcome;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// POST /auth/signup - Register a user-pool account with `email` and `name` attributes
pub async fn signup_post(
    State(state): State<AppState>,
    Json(body): Json<SignUpRequest>,
) -> ApiResult<SignUpOutcome> {
    let email = required(&body.email, "email")?;
    let password = required(&body.password, "password")?;
    let name = required(&body.name, "name")?;

    let outcome = state.identity.sign_up(email, password, name).await?;
    info!("Signed up {} (confirmed: {})", email, outcome.user_confirmed);
    Ok(ApiResponse::created(outcome))
}
