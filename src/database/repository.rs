use async_trait::async_trait;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{
    ApiKey, ChatMessage, ChatRole, NewSwinger, NewUser, Swinger, SwingerKey, SwingerPatch, User, UserPatch,
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert the identity on first sight, otherwise refresh username/email/provider
    async fn upsert_identity(
        &self,
        sub: &str,
        username: &str,
        email: Option<&str>,
        provider: &str,
    ) -> Result<User, DatabaseError>;
    async fn find(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;
    async fn list(&self, limit: Option<i64>) -> Result<Vec<User>, DatabaseError>;
    async fn count(&self) -> Result<i64, DatabaseError>;
    async fn create(&self, user: NewUser) -> Result<User, DatabaseError>;
    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<User, DatabaseError>;
    async fn delete(&self, id: Uuid) -> Result<User, DatabaseError>;
}

#[async_trait]
pub trait ApiKeyRepository: Send + Sync {
    async fn insert(&self, user_id: Uuid, key_hash: &str, label: Option<&str>) -> Result<ApiKey, DatabaseError>;
    /// Owner of the key with this hash
    async fn find_owner(&self, key_hash: &str) -> Result<Option<User>, DatabaseError>;
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ApiKey>, DatabaseError>;
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait SwingerRepository: Send + Sync {
    async fn count(&self) -> Result<i64, DatabaseError>;
    async fn create(&self, swinger: NewSwinger) -> Result<Swinger, DatabaseError>;
    async fn update(&self, key: &SwingerKey, patch: SwingerPatch) -> Result<Swinger, DatabaseError>;
    async fn list(&self, limit: Option<i64>) -> Result<Vec<Swinger>, DatabaseError>;
    async fn find(&self, key: &SwingerKey) -> Result<Option<Swinger>, DatabaseError>;
    /// Insert, or replace only `json_data` when the swinger id exists
    async fn upsert(&self, swinger: NewSwinger) -> Result<Swinger, DatabaseError>;
    async fn delete(&self, key: &SwingerKey) -> Result<Swinger, DatabaseError>;
}

#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn append(
        &self,
        chat_id: Uuid,
        user_email: &str,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatMessage, DatabaseError>;
    async fn history(&self, chat_id: Uuid) -> Result<Vec<ChatMessage>, DatabaseError>;
}
