pub mod api_key;
pub mod cognito;
pub mod jwks;
pub mod oauth;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use jwks::{JwksEndpoints, JwksSource, TokenVerifier};

/// Provider name reported when a token carries no issuer
pub const DEFAULT_PROVIDER: &str = "Amazon Cognito";

/// Claims read from an identity provider's access or id token
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub iss: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, rename = "cognito:username")]
    pub cognito_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Claims {
    /// First of `username`, `cognito:username`, `email`, `sub` that is present
    pub fn display_username(&self) -> String {
        self.username
            .clone()
            .or_else(|| self.cognito_username.clone())
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| self.sub.clone())
    }

    pub fn provider(&self) -> String {
        self.iss.clone().unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
    }
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("no token supplied")]
    Missing,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token header has no kid")]
    MissingKid,

    #[error("no signing key matches kid {0}")]
    UnknownKey(String),

    #[error("failed to fetch signing keys from {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("no key set configured for {0:?}")]
    SourceUnavailable(JwksSource),

    #[error("token rejected: {0}")]
    Invalid(String),

    #[error("api key not recognised")]
    UnknownApiKey,
}

/// Issuer as written in the token payload, read before any signature check
#[derive(Debug, Deserialize)]
struct UnverifiedPayload {
    #[serde(default)]
    iss: Option<String>,
}

pub(crate) fn peek_issuer(token: &str) -> Result<Option<String>, VerifyError> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(VerifyError::Malformed("expected three segments".to_string())),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| VerifyError::Malformed(e.to_string()))?;
    let parsed: UnverifiedPayload =
        serde_json::from_slice(&bytes).map_err(|e| VerifyError::Malformed(e.to_string()))?;
    Ok(parsed.iss)
}
