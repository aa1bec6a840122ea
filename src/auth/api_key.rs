use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Header carrying an API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// A freshly issued key. `secret` is shown to the caller once and only its hash is stored.
#[derive(Debug, Clone)]
pub struct IssuedKey {
    pub secret: String,
    pub hash: String,
}

pub fn issue() -> IssuedKey {
    let secret = Uuid::new_v4().to_string();
    let hash = hash_key(&secret);
    IssuedKey { secret, hash }
}

/// Lowercase hex SHA-256 of the trimmed key
pub fn hash_key(key: &str) -> String {
    let digest = Sha256::digest(key.trim().as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
