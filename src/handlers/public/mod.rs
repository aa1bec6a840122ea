// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition, OAuth redirects and liveness endpoints.

pub mod auth;
pub mod oauth;
pub mod root;
