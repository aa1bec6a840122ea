// handlers/protected/users/mod.rs - Local profile and Cognito user administration

pub mod admin;
pub mod profile;

pub use profile::local_user;
