// handlers/protected/auth/mod.rs - Session administration and API keys

pub mod admin_logout;
pub mod api_keys;

pub use admin_logout::admin_logout_post;
