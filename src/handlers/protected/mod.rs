// handlers/protected/mod.rs - Handlers behind the `require_auth` guard
//
// Every handler here can extract `AuthUser`; the guard has already rejected
// unknown API keys and unverifiable tokens with 401.

pub mod ai;
pub mod auth;
pub mod dynamodb;
pub mod files;
pub mod log;
pub mod prisma;
pub mod swingers;
pub mod users;
