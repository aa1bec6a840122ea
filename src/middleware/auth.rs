use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

use crate::auth::api_key::{self, API_KEY_HEADER};
use crate::auth::{Claims, VerifyError};
use crate::database::models::User;
use crate::error::{ApiError, UNAUTHORIZED_MESSAGE};
use crate::state::AppState;

/// Cookie set by `/auth/signin`
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Provider reported for callers authenticated by API key
pub const API_KEY_PROVIDER: &str = "api-key";

/// Authenticated caller, from either a verified token or an API key
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub provider: String,
    /// Local user row, known up front only for API-key callers
    #[serde(skip)]
    pub local_id: Option<Uuid>,
}

impl AuthUser {
    pub fn is_api_key(&self) -> bool {
        self.provider == API_KEY_PROVIDER
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            username: claims.display_username(),
            provider: claims.provider(),
            email: claims.email,
            id: claims.sub,
            local_id: None,
        }
    }
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.sub,
            username: user.username,
            email: user.email,
            provider: API_KEY_PROVIDER.to_string(),
            local_id: Some(user.id),
        }
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized(UNAUTHORIZED_MESSAGE))
    }
}

/// Guard for protected routes. Puts the caller into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, request.headers(), &jar, None).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Resolve the caller from `x-api-key`, or else from a bearer token, the
/// `access_token` cookie, or `query_token` in that order
pub async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    jar: &CookieJar,
    query_token: Option<&str>,
) -> Result<AuthUser, ApiError> {
    if let Some(key) = headers.get(API_KEY_HEADER) {
        let key = key.to_str().unwrap_or_default();
        return authenticate_api_key(state, key).await;
    }

    let token = bearer_token(headers)
        .or_else(|| jar.get(ACCESS_TOKEN_COOKIE).map(|c| c.value().to_string()))
        .or_else(|| query_token.filter(|t| !t.is_empty()).map(str::to_string))
        .ok_or(VerifyError::Missing)?;

    let claims = state.verifier.verify(&token).await?;
    Ok(AuthUser::from(claims))
}

async fn authenticate_api_key(state: &AppState, key: &str) -> Result<AuthUser, ApiError> {
    if key.trim().is_empty() {
        return Err(VerifyError::UnknownApiKey.into());
    }

    match state.api_keys.find_owner(&api_key::hash_key(key)).await {
        Ok(Some(owner)) => Ok(AuthUser::from(owner)),
        Ok(None) => Err(VerifyError::UnknownApiKey.into()),
        Err(e) => {
            error!("API key lookup failed, rejecting key: {}", e);
            Err(ApiError::unauthorized(UNAUTHORIZED_MESSAGE))
        }
    }
}

/// Token from `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then(|| token.to_string())
}
