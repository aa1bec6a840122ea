use std::collections::HashMap;
use std::sync::Arc;

use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{peek_issuer, Claims, VerifyError};
use crate::config::{AwsConfig, IdentityConfig};

const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

/// Identity provider whose key set signs a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JwksSource {
    Cognito,
    Auth0,
    Google,
    Azure,
}

impl JwksSource {
    /// Route by issuer substring. Anything unrecognised, or no issuer at all, is Cognito.
    pub fn for_issuer(iss: Option<&str>) -> Self {
        match iss {
            Some(iss) if iss.contains("auth0.com") => JwksSource::Auth0,
            Some(iss) if iss.contains("google.com") => JwksSource::Google,
            Some(iss) if iss.contains("microsoftonline.com") => JwksSource::Azure,
            _ => JwksSource::Cognito,
        }
    }
}

/// Key set URL per provider
#[derive(Debug, Clone, Default)]
pub struct JwksEndpoints {
    pub cognito: Option<String>,
    pub auth0: Option<String>,
    pub google: Option<String>,
    pub azure: Option<String>,
}

impl JwksEndpoints {
    pub fn from_config(aws: &AwsConfig, identity: &IdentityConfig) -> Self {
        let cognito = identity.cognito_jwks_url.clone().or_else(|| {
            (!aws.user_pool_id.is_empty()).then(|| {
                format!(
                    "https://cognito-idp.{}.amazonaws.com/{}/.well-known/jwks.json",
                    aws.region, aws.user_pool_id
                )
            })
        });
        let auth0 = identity.auth0_jwks_url.clone().or_else(|| {
            identity
                .auth0_domain
                .as_ref()
                .map(|domain| format!("https://{}/.well-known/jwks.json", domain))
        });
        let google = identity
            .google_jwks_url
            .clone()
            .or_else(|| Some(GOOGLE_JWKS_URL.to_string()));
        let azure = identity.azure_jwks_url.clone().or_else(|| {
            identity.azure_tenant_id.as_ref().map(|tenant| {
                format!("https://login.microsoftonline.com/{}/discovery/v2.0/keys", tenant)
            })
        });

        Self {
            cognito,
            auth0,
            google,
            azure,
        }
    }

    pub fn url(&self, source: JwksSource) -> Option<&str> {
        match source {
            JwksSource::Cognito => self.cognito.as_deref(),
            JwksSource::Auth0 => self.auth0.as_deref(),
            JwksSource::Google => self.google.as_deref(),
            JwksSource::Azure => self.azure.as_deref(),
        }
    }
}

/// Verifies RS256 tokens from any configured provider.
///
/// Key sets are fetched on first use and kept for the life of the process.
/// A failed fetch leaves the cache untouched so the next request retries.
pub struct TokenVerifier {
    endpoints: JwksEndpoints,
    http: reqwest::Client,
    cache: RwLock<HashMap<JwksSource, Arc<JwkSet>>>,
}

impl TokenVerifier {
    pub fn new(endpoints: JwksEndpoints, http: reqwest::Client) -> Self {
        Self {
            endpoints,
            http,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(VerifyError::Missing);
        }

        let header = decode_header(token).map_err(|e| VerifyError::Malformed(e.to_string()))?;
        let kid = header.kid.ok_or(VerifyError::MissingKid)?;
        let source = JwksSource::for_issuer(peek_issuer(token)?.as_deref());

        let keys = self.key_set(source).await?;
        let jwk = keys.find(&kid).ok_or_else(|| VerifyError::UnknownKey(kid.clone()))?;
        let key = DecodingKey::from_jwk(jwk).map_err(|e| VerifyError::Invalid(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;

        let data = decode::<Claims>(token, &key, &validation)
            .map_err(|e| VerifyError::Invalid(e.to_string()))?;
        Ok(data.claims)
    }

    async fn key_set(&self, source: JwksSource) -> Result<Arc<JwkSet>, VerifyError> {
        if let Some(set) = self.cache.read().await.get(&source) {
            return Ok(set.clone());
        }

        let url = self
            .endpoints
            .url(source)
            .ok_or(VerifyError::SourceUnavailable(source))?;
        debug!("Fetching JWKS for {:?} from {}", source, url);

        let fetched = self.fetch(url).await?;

        // Concurrent first requests may both fetch; whichever lands first is kept
        let mut cache = self.cache.write().await;
        let set = cache.entry(source).or_insert_with(|| Arc::new(fetched)).clone();
        info!("Cached {} signing keys for {:?}", set.keys.len(), source);
        Ok(set)
    }

    async fn fetch(&self, url: &str) -> Result<JwkSet, VerifyError> {
        let fetch_error = |reason: String| VerifyError::Fetch {
            url: url.to_string(),
            reason,
        };

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(fetch_error(format!("status {}", response.status())));
        }
        response.json::<JwkSet>().await.map_err(|e| fetch_error(e.to_string()))
    }

    /// Seed the cache without a network fetch
    #[cfg(test)]
    pub async fn preload(&self, source: JwksSource, set: JwkSet) {
        self.cache.write().await.insert(source, Arc::new(set));
    }
}
