// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::auth::cognito::CognitoError;
use crate::auth::oauth::OAuthError;
use crate::auth::VerifyError;
use crate::database::DatabaseError;
use crate::services::ai::AiError;
use crate::services::dynamodb::DynamoError;
use crate::services::files::FileError;
use crate::services::swinger_import::ImportError;

/// Message returned for every failed credential check. The cause is logged, never surfaced.
pub const UNAUTHORIZED_MESSAGE: &str = "Invalid or expired token";

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (external service issues)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::InternalServerError(msg)
            | ApiError::BadGateway(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<VerifyError> for ApiError {
    fn from(err: VerifyError) -> Self {
        tracing::warn!("Token verification failed: {}", err);
        ApiError::unauthorized(UNAUTHORIZED_MESSAGE)
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Conflict(msg) => ApiError::conflict(msg),
            DatabaseError::ConfigMissing(name) => {
                tracing::error!("Database not configured: {} missing", name);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("DATABASE_URL is not a valid Postgres URL");
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error("Database error occurred")
            }
            DatabaseError::Migration(e) => {
                tracing::error!("Migration error: {}", e);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
        }
    }
}

impl From<CognitoError> for ApiError {
    fn from(err: CognitoError) -> Self {
        match err {
            CognitoError::NotAuthorized(msg) => ApiError::unauthorized(msg),
            CognitoError::UserNotFound(msg) => ApiError::not_found(msg),
            CognitoError::UsernameExists(msg) => ApiError::conflict(msg),
            CognitoError::InvalidInput(msg) => ApiError::bad_request(msg),
            CognitoError::Service(msg) => {
                tracing::error!("Cognito error: {}", msg);
                ApiError::internal_server_error("Identity provider request failed")
            }
        }
    }
}

impl From<OAuthError> for ApiError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::NotConfigured(what) => {
                tracing::error!("OAuth provider not configured: {}", what);
                ApiError::service_unavailable(format!("{} login is not configured", what))
            }
            OAuthError::MissingCode => ApiError::bad_request("Authorization code is required"),
            other => {
                tracing::error!("OAuth exchange failed: {}", other);
                ApiError::bad_request("Invalid or expired authorization")
            }
        }
    }
}

impl From<FileError> for ApiError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::MissingPath => ApiError::bad_request("File path is required"),
            FileError::NotFound(path) => ApiError::not_found(format!("File/Folder not found: {}", path)),
            FileError::Io { path, source } => {
                tracing::error!("File operation on {} failed: {}", path, source);
                ApiError::internal_server_error(format!("File operation failed: {}", source))
            }
        }
    }
}

impl From<DynamoError> for ApiError {
    fn from(err: DynamoError) -> Self {
        match err {
            DynamoError::InvalidRequest(msg) => ApiError::bad_request(msg),
            DynamoError::Sdk(msg) => {
                tracing::error!("DynamoDB error: {}", msg);
                ApiError::internal_server_error("DynamoDB request failed")
            }
        }
    }
}

impl From<AiError> for ApiError {
    fn from(err: AiError) -> Self {
        match err {
            AiError::NotConfigured(what) => {
                tracing::error!("AI provider not configured: {}", what);
                ApiError::service_unavailable(format!("{} is not configured", what))
            }
            AiError::EmptyInput => ApiError::bad_request("Input text is required"),
            other => {
                tracing::error!("AI provider error: {}", other);
                ApiError::bad_gateway(other.to_string())
            }
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Database(e) => e.into(),
            other => {
                tracing::error!("Swinger import failed: {}", other);
                ApiError::bad_request(other.to_string())
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}
