use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{AwsConfig, OAuthConfig};

const GOOGLE_AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
const GITHUB_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const GITHUB_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const GITHUB_USER_URL: &str = "https://api.github.com/user";

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("{0} OAuth client is not configured")]
    NotConfigured(&'static str),

    #[error("authorization code missing")]
    MissingCode,

    #[error("provider rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("provider response missing {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// Profile returned from the Google callback
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoogleProfile {
    pub google_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    name: Option<String>,
    email: Option<String>,
    picture: Option<String>,
}

impl From<GoogleUserInfo> for GoogleProfile {
    fn from(info: GoogleUserInfo) -> Self {
        Self {
            google_id: info.sub,
            name: info.name,
            email: info.email,
            photo_url: info.picture,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubLogin {
    pub access_token: String,
    pub profile: Value,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Authorization-code flows for Google, GitHub and the Cognito hosted UI
#[derive(Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    oauth: OAuthConfig,
    aws: AwsConfig,
}

impl OAuthClient {
    pub fn new(http: reqwest::Client, oauth: OAuthConfig, aws: AwsConfig) -> Self {
        Self { http, oauth, aws }
    }

    pub fn google_authorize_url(&self) -> Result<String, OAuthError> {
        if self.oauth.google_client_id.is_empty() {
            return Err(OAuthError::NotConfigured("Google"));
        }
        let url = url::Url::parse_with_params(
            GOOGLE_AUTHORIZE_URL,
            &[
                ("client_id", self.oauth.google_client_id.as_str()),
                ("redirect_uri", self.oauth.google_callback().as_str()),
                ("response_type", "code"),
                ("scope", "email profile"),
            ],
        )?;
        Ok(url.into())
    }

    pub async fn google_callback(&self, code: &str) -> Result<GoogleProfile, OAuthError> {
        if code.is_empty() {
            return Err(OAuthError::MissingCode);
        }
        if self.oauth.google_client_id.is_empty() || self.oauth.google_client_secret.is_empty() {
            return Err(OAuthError::NotConfigured("Google"));
        }

        let redirect_uri = self.oauth.google_callback();
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.oauth.google_client_id.as_str()),
            ("client_secret", self.oauth.google_client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
        ];
        let token = self.exchange(GOOGLE_TOKEN_URL, &params).await?;

        let info: GoogleUserInfo = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!("Google login for {}", info.sub);
        Ok(info.into())
    }

    pub fn github_authorize_url(&self) -> Result<String, OAuthError> {
        if self.oauth.github_client_id.is_empty() {
            return Err(OAuthError::NotConfigured("GitHub"));
        }
        let url = url::Url::parse_with_params(
            GITHUB_AUTHORIZE_URL,
            &[
                ("client_id", self.oauth.github_client_id.as_str()),
                ("redirect_uri", self.oauth.github_callback().as_str()),
                ("scope", "user:email"),
            ],
        )?;
        Ok(url.into())
    }

    pub async fn github_callback(&self, code: &str) -> Result<GithubLogin, OAuthError> {
        if code.is_empty() {
            return Err(OAuthError::MissingCode);
        }
        if self.oauth.github_client_id.is_empty() || self.oauth.github_client_secret.is_empty() {
            return Err(OAuthError::NotConfigured("GitHub"));
        }

        let redirect_uri = self.oauth.github_callback();
        let params = [
            ("code", code),
            ("client_id", self.oauth.github_client_id.as_str()),
            ("client_secret", self.oauth.github_client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
        ];
        let access_token = self.exchange(GITHUB_TOKEN_URL, &params).await?;

        let profile: Value = self
            .http
            .get(GITHUB_USER_URL)
            .bearer_auth(&access_token)
            .header(reqwest::header::USER_AGENT, env!("CARGO_PKG_NAME"))
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(GithubLogin { access_token, profile })
    }

    /// Trade a hosted-UI authorization code for Cognito tokens
    pub async fn cognito_exchange_code(&self, code: &str) -> Result<Value, OAuthError> {
        if code.is_empty() {
            return Err(OAuthError::MissingCode);
        }
        if self.aws.cognito_domain.is_empty() {
            return Err(OAuthError::NotConfigured("Cognito hosted UI"));
        }

        let mut params = vec![
            ("grant_type", "authorization_code"),
            ("client_id", self.aws.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.aws.redirect_uri.as_str()),
        ];
        if let Some(secret) = self.aws.client_secret.as_deref() {
            params.push(("client_secret", secret));
        }

        let response = self
            .http
            .post(format!("{}/oauth2/token", self.aws.cognito_domain))
            .form(&params)
            .send()
            .await?;
        Self::json_or_rejected(response).await
    }

    pub async fn cognito_user_info(&self, access_token: &str) -> Result<Value, OAuthError> {
        if self.aws.cognito_domain.is_empty() {
            return Err(OAuthError::NotConfigured("Cognito hosted UI"));
        }
        let response = self
            .http
            .get(format!("{}/oauth2/userInfo", self.aws.cognito_domain))
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::json_or_rejected(response).await
    }

    async fn exchange(&self, url: &str, params: &[(&str, &str)]) -> Result<String, OAuthError> {
        let response = self
            .http
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(params)
            .send()
            .await?;
        let status = response.status();
        let body: TokenResponse = response.json().await?;

        match body.access_token {
            Some(token) if status.is_success() => Ok(token),
            _ => {
                let reason = body
                    .error_description
                    .or(body.error)
                    .unwrap_or_else(|| "no access_token in response".to_string());
                warn!("Token exchange at {} failed: {}", url, reason);
                Err(OAuthError::Rejected {
                    status: status.as_u16(),
                    body: reason,
                })
            }
        }
    }

    async fn json_or_rejected(response: reqwest::Response) -> Result<Value, OAuthError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}
