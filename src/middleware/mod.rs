pub mod auth;
pub mod response;

pub use auth::{authenticate, require_auth, AuthUser, ACCESS_TOKEN_COOKIE};
pub use response::{ApiResponse, ApiResult};
