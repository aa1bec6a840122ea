// handlers/public/auth/mod.rs - Cognito user-pool sessions

pub mod logout;
pub mod refresh;
pub mod signin;
pub mod signup;

pub use logout::logout_post;
pub use refresh::refresh_post;
pub use signin::signin_post;
pub use signup::signup_post;

use crate::error::ApiError;

/// Reject blank required fields before calling Cognito
pub(crate) fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("{} is required", field)));
    }
    Ok(value)
}
