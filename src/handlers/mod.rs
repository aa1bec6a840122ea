// handlers/mod.rs - Route handlers grouped by access tier
//
// Public (no auth) -> Protected (`require_auth` guard: API key or verified token)

pub mod protected;
pub mod public;
