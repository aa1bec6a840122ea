use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cognitoidentityprovider::types::{
    AttributeType, AuthFlowType, AuthenticationResultType, MessageActionType, UserType,
};
use aws_sdk_cognitoidentityprovider::Client;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AwsConfig;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum CognitoError {
    #[error("{0}")]
    NotAuthorized(String),

    #[error("{0}")]
    UserNotFound(String),

    #[error("{0}")]
    UsernameExists(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Service(String),
}

impl CognitoError {
    /// Classify a Cognito service error code
    pub fn from_code(code: &str, message: String) -> Self {
        match code {
            "NotAuthorizedException" | "UserNotConfirmedException" | "PasswordResetRequiredException" => {
                CognitoError::NotAuthorized(message)
            }
            "UserNotFoundException" => CognitoError::UserNotFound(message),
            "UsernameExistsException" | "AliasExistsException" => CognitoError::UsernameExists(message),
            "InvalidParameterException" | "InvalidPasswordException" | "CodeMismatchException" => {
                CognitoError::InvalidInput(message)
            }
            _ => CognitoError::Service(message),
        }
    }
}

fn map_sdk_error<E, R>(err: SdkError<E, R>) -> CognitoError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let code = err.code().unwrap_or_default().to_string();
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    CognitoError::from_code(&code, message)
}

/// `base64(HMAC-SHA256(client_secret, username + client_id))`
pub fn secret_hash(client_secret: &str, username: &str, client_id: &str) -> Result<String, CognitoError> {
    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .map_err(|e| CognitoError::Service(format!("invalid client secret: {}", e)))?;
    mac.update(username.as_bytes());
    mac.update(client_id.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SignUpOutcome {
    pub user_confirmed: bool,
    pub user_sub: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: Option<String>,
    pub id_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: i32,
    pub token_type: Option<String>,
}

impl From<&AuthenticationResultType> for AuthTokens {
    fn from(result: &AuthenticationResultType) -> Self {
        Self {
            access_token: result.access_token().map(str::to_string),
            id_token: result.id_token().map(str::to_string),
            refresh_token: result.refresh_token().map(str::to_string),
            expires_in: result.expires_in(),
            token_type: result.token_type().map(str::to_string),
        }
    }
}

/// A `Name`/`Value` pair as Cognito spells it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserAttribute {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CognitoUser {
    pub username: String,
    pub attributes: Vec<UserAttribute>,
    pub enabled: bool,
    pub user_status: Option<String>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl CognitoUser {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }
}

fn to_attributes(attrs: &[AttributeType]) -> Vec<UserAttribute> {
    attrs
        .iter()
        .map(|a| UserAttribute {
            name: a.name().to_string(),
            value: a.value().unwrap_or_default().to_string(),
        })
        .collect()
}

fn to_timestamp(date: Option<&aws_sdk_cognitoidentityprovider::primitives::DateTime>) -> Option<chrono::DateTime<chrono::Utc>> {
    date.and_then(|d| chrono::DateTime::from_timestamp(d.secs(), d.subsec_nanos()))
}

impl From<&UserType> for CognitoUser {
    fn from(user: &UserType) -> Self {
        Self {
            username: user.username().unwrap_or_default().to_string(),
            attributes: to_attributes(user.attributes()),
            enabled: user.enabled(),
            user_status: user.user_status().map(|s| s.as_str().to_string()),
            created_at: to_timestamp(user.user_create_date()),
        }
    }
}

fn attribute(name: &str, value: &str) -> Result<AttributeType, CognitoError> {
    AttributeType::builder()
        .name(name)
        .value(value)
        .build()
        .map_err(|e| CognitoError::InvalidInput(e.to_string()))
}

/// User pool operations used by the auth and user handlers
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<SignUpOutcome, CognitoError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthTokens, CognitoError>;
    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, CognitoError>;
    async fn global_sign_out(&self, access_token: &str) -> Result<(), CognitoError>;
    async fn admin_sign_out(&self, username: &str) -> Result<(), CognitoError>;
    async fn admin_create_user(&self, email: &str, name: &str) -> Result<CognitoUser, CognitoError>;
    async fn list_users(&self) -> Result<Vec<CognitoUser>, CognitoError>;
    async fn admin_get_user(&self, username: &str) -> Result<CognitoUser, CognitoError>;
    async fn admin_update_attributes(&self, username: &str, attributes: &[UserAttribute]) -> Result<(), CognitoError>;
    async fn admin_delete_user(&self, username: &str) -> Result<(), CognitoError>;
}

/// Cognito user pool client
pub struct CognitoIdentity {
    client: Client,
    user_pool_id: String,
    client_id: String,
    client_secret: Option<String>,
}

impl CognitoIdentity {
    pub fn new(client: Client, aws: &AwsConfig) -> Self {
        Self {
            client,
            user_pool_id: aws.user_pool_id.clone(),
            client_id: aws.client_id.clone(),
            client_secret: aws.client_secret.clone(),
        }
    }

    fn secret_hash_for(&self, username: &str) -> Result<Option<String>, CognitoError> {
        self.client_secret
            .as_deref()
            .map(|secret| secret_hash(secret, username, &self.client_id))
            .transpose()
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentity {
    async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<SignUpOutcome, CognitoError> {
        let output = self
            .client
            .sign_up()
            .client_id(&self.client_id)
            .username(email)
            .password(password)
            .user_attributes(attribute("email", email)?)
            .user_attributes(attribute("name", name)?)
            .set_secret_hash(self.secret_hash_for(email)?)
            .send()
            .await
            .map_err(map_sdk_error)?;

        info!("Signed up {}", email);
        Ok(SignUpOutcome {
            user_confirmed: output.user_confirmed(),
            user_sub: output.user_sub().to_string(),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthTokens, CognitoError> {
        let mut request = self
            .client
            .initiate_auth()
            .auth_flow(AuthFlowType::UserPasswordAuth)
            .client_id(&self.client_id)
            .auth_parameters("USERNAME", email)
            .auth_parameters("PASSWORD", password);
        if let Some(hash) = self.secret_hash_for(email)? {
            request = request.auth_parameters("SECRET_HASH", hash);
        }

        let output = request.send().await.map_err(map_sdk_error)?;
        match output.authentication_result() {
            Some(result) => Ok(AuthTokens::from(result)),
            None => {
                let challenge = output
                    .challenge_name()
                    .map(|c| c.as_str().to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                warn!("Sign-in for {} requires challenge {}", email, challenge);
                Err(CognitoError::NotAuthorized(format!(
                    "Additional authentication step required: {}",
                    challenge
                )))
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, CognitoError> {
        let output = self
            .client
            .initiate_auth()
            .auth_flow(AuthFlowType::RefreshTokenAuth)
            .client_id(&self.client_id)
            .auth_parameters("REFRESH_TOKEN", refresh_token)
            .send()
            .await
            .map_err(map_sdk_error)?;

        output
            .authentication_result()
            .map(AuthTokens::from)
            .ok_or_else(|| CognitoError::NotAuthorized("Refresh token rejected".to_string()))
    }

    async fn global_sign_out(&self, access_token: &str) -> Result<(), CognitoError> {
        self.client
            .global_sign_out()
            .access_token(access_token)
            .send()
            .await
            .map_err(map_sdk_error)?;
        Ok(())
    }

    async fn admin_sign_out(&self, username: &str) -> Result<(), CognitoError> {
        self.client
            .admin_user_global_sign_out()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .send()
            .await
            .map_err(map_sdk_error)?;
        info!("Forced sign-out of {}", username);
        Ok(())
    }

    async fn admin_create_user(&self, email: &str, name: &str) -> Result<CognitoUser, CognitoError> {
        let output = self
            .client
            .admin_create_user()
            .user_pool_id(&self.user_pool_id)
            .username(email)
            .user_attributes(attribute("email", email)?)
            .user_attributes(attribute("name", name)?)
            .message_action(MessageActionType::Suppress)
            .send()
            .await
            .map_err(map_sdk_error)?;

        output
            .user()
            .map(CognitoUser::from)
            .ok_or_else(|| CognitoError::Service("AdminCreateUser returned no user".to_string()))
    }

    async fn list_users(&self) -> Result<Vec<CognitoUser>, CognitoError> {
        let output = self
            .client
            .list_users()
            .user_pool_id(&self.user_pool_id)
            .send()
            .await
            .map_err(map_sdk_error)?;
        Ok(output.users().iter().map(CognitoUser::from).collect())
    }

    async fn admin_get_user(&self, username: &str) -> Result<CognitoUser, CognitoError> {
        let output = self
            .client
            .admin_get_user()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .send()
            .await
            .map_err(map_sdk_error)?;

        Ok(CognitoUser {
            username: output.username().to_string(),
            attributes: to_attributes(output.user_attributes()),
            enabled: output.enabled(),
            user_status: output.user_status().map(|s| s.as_str().to_string()),
            created_at: to_timestamp(output.user_create_date()),
        })
    }

    async fn admin_update_attributes(&self, username: &str, attributes: &[UserAttribute]) -> Result<(), CognitoError> {
        let attributes = attributes
            .iter()
            .map(|a| attribute(&a.name, &a.value))
            .collect::<Result<Vec<_>, _>>()?;

        self.client
            .admin_update_user_attributes()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .set_user_attributes(Some(attributes))
            .send()
            .await
            .map_err(map_sdk_error)?;
        Ok(())
    }

    async fn admin_delete_user(&self, username: &str) -> Result<(), CognitoError> {
        self.client
            .admin_delete_user()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .send()
            .await
            .map_err(map_sdk_error)?;
        info!("Deleted user {}", username);
        Ok(())
    }
}
