use async_trait::async_trait;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{
    ApiKey, ChatMessage, ChatRole, NewSwinger, NewUser, Swinger, SwingerKey, SwingerPatch, User, UserPatch,
};
use crate::database::repository::{ApiKeyRepository, ChatRepository, SwingerRepository, UserRepository};

const USER_COLUMNS: &str = "id, sub, username, email, provider, created_at, updated_at";
const SWINGER_COLUMNS: &str = "id, swinger_id, email, name, json_data, created_at, updated_at";

fn swinger_filter(key: &SwingerKey) -> &'static str {
    match key {
        SwingerKey::Id(_) => "id = $1",
        SwingerKey::SwingerId(_) => "swinger_id = $1",
    }
}

/// Bind the key value as the first parameter
macro_rules! bind_swinger_key {
    ($query:expr, $key:expr) => {
        match $key {
            SwingerKey::Id(id) => $query.bind(*id),
            SwingerKey::SwingerId(id) => $query.bind(id.clone()),
        }
    };
}

pub struct PgUserRepository {
    db: DatabaseManager,
}

impl PgUserRepository {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn upsert_identity(
        &self,
        sub: &str,
        username: &str,
        email: Option<&str>,
        provider: &str,
    ) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users (sub, username, email, provider) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (sub) DO UPDATE SET username = EXCLUDED.username, email = EXCLUDED.email, \
             provider = EXCLUDED.provider, updated_at = now() \
             RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(sub)
            .bind(username)
            .bind(email)
            .bind(provider)
            .fetch_one(self.db.pool()?)
            .await?;
        Ok(user)
    }

    async fn find(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool()?)
            .await?;
        Ok(user)
    }

    async fn list(&self, limit: Option<i64>) -> Result<Vec<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users ORDER BY created_at LIMIT $1", USER_COLUMNS);
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(limit)
            .fetch_all(self.db.pool()?)
            .await?;
        Ok(users)
    }

    async fn count(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.db.pool()?)
            .await?;
        Ok(count)
    }

    async fn create(&self, user: NewUser) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users (sub, username, email, provider) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.sub)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.provider)
            .fetch_one(self.db.pool()?)
            .await
            .map_err(|e| DatabaseError::on_unique(e, || format!("User with sub {} already exists", user.sub)))
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<User, DatabaseError> {
        let sql = format!(
            "UPDATE users SET username = COALESCE($2, username), email = COALESCE($3, email), \
             provider = COALESCE($4, provider), updated_at = now() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(patch.username)
            .bind(patch.email)
            .bind(patch.provider)
            .fetch_optional(self.db.pool()?)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {} not found", id)))
    }

    async fn delete(&self, id: Uuid) -> Result<User, DatabaseError> {
        let sql = format!("DELETE FROM users WHERE id = $1 RETURNING {}", USER_COLUMNS);
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.db.pool()?)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {} not found", id)))
    }
}

pub struct PgApiKeyRepository {
    db: DatabaseManager,
}

impl PgApiKeyRepository {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ApiKeyRepository for PgApiKeyRepository {
    async fn insert(&self, user_id: Uuid, key_hash: &str, label: Option<&str>) -> Result<ApiKey, DatabaseError> {
        sqlx::query_as::<_, ApiKey>(
            "INSERT INTO api_keys (key_hash, user_id, label) VALUES ($1, $2, $3) \
             RETURNING id, key_hash, user_id, label, created_at",
        )
        .bind(key_hash)
        .bind(user_id)
        .bind(label)
        .fetch_one(self.db.pool()?)
        .await
        .map_err(|e| DatabaseError::on_unique(e, || "API key already exists".to_string()))
    }

    async fn find_owner(&self, key_hash: &str) -> Result<Option<User>, DatabaseError> {
        let owner = sqlx::query_as::<_, User>(
            "SELECT u.id, u.sub, u.username, u.email, u.provider, u.created_at, u.updated_at \
             FROM api_keys k JOIN users u ON u.id = k.user_id WHERE k.key_hash = $1",
        )
        .bind(key_hash)
        .fetch_optional(self.db.pool()?)
        .await?;
        Ok(owner)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ApiKey>, DatabaseError> {
        let keys = sqlx::query_as::<_, ApiKey>(
            "SELECT id, key_hash, user_id, label, created_at FROM api_keys \
             WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(self.db.pool()?)
        .await?;
        Ok(keys)
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.db.pool()?)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("API key {} not found", id)));
        }
        Ok(())
    }
}

pub struct PgSwingerRepository {
    db: DatabaseManager,
}

impl PgSwingerRepository {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SwingerRepository for PgSwingerRepository {
    async fn count(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM swingers")
            .fetch_one(self.db.pool()?)
            .await?;
        Ok(count)
    }

    async fn create(&self, swinger: NewSwinger) -> Result<Swinger, DatabaseError> {
        let sql = format!(
            "INSERT INTO swingers (swinger_id, email, name, json_data) VALUES ($1, $2, $3, $4) RETURNING {}",
            SWINGER_COLUMNS
        );
        sqlx::query_as::<_, Swinger>(&sql)
            .bind(&swinger.swinger_id)
            .bind(&swinger.email)
            .bind(&swinger.name)
            .bind(&swinger.json_data)
            .fetch_one(self.db.pool()?)
            .await
            .map_err(|e| {
                DatabaseError::on_unique(e, || format!("Swinger {} already exists", swinger.swinger_id))
            })
    }

    async fn update(&self, key: &SwingerKey, patch: SwingerPatch) -> Result<Swinger, DatabaseError> {
        let sql = format!(
            "UPDATE swingers SET email = COALESCE($2, email), name = COALESCE($3, name), \
             json_data = COALESCE($4, json_data), updated_at = now() WHERE {} RETURNING {}",
            swinger_filter(key),
            SWINGER_COLUMNS
        );
        let query = sqlx::query_as::<_, Swinger>(&sql);
        bind_swinger_key!(query, key)
            .bind(patch.email)
            .bind(patch.name)
            .bind(patch.json_data)
            .fetch_optional(self.db.pool()?)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Swinger with {} not found", key)))
    }

    async fn list(&self, limit: Option<i64>) -> Result<Vec<Swinger>, DatabaseError> {
        let sql = format!("SELECT {} FROM swingers ORDER BY created_at LIMIT $1", SWINGER_COLUMNS);
        let rows = sqlx::query_as::<_, Swinger>(&sql)
            .bind(limit)
            .fetch_all(self.db.pool()?)
            .await?;
        Ok(rows)
    }

    async fn find(&self, key: &SwingerKey) -> Result<Option<Swinger>, DatabaseError> {
        let sql = format!("SELECT {} FROM swingers WHERE {}", SWINGER_COLUMNS, swinger_filter(key));
        let query = sqlx::query_as::<_, Swinger>(&sql);
        let row = bind_swinger_key!(query, key)
            .fetch_optional(self.db.pool()?)
            .await?;
        Ok(row)
    }

    async fn upsert(&self, swinger: NewSwinger) -> Result<Swinger, DatabaseError> {
        let sql = format!(
            "INSERT INTO swingers (swinger_id, email, name, json_data) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (swinger_id) DO UPDATE SET json_data = EXCLUDED.json_data, updated_at = now() \
             RETURNING {}",
            SWINGER_COLUMNS
        );
        let row = sqlx::query_as::<_, Swinger>(&sql)
            .bind(&swinger.swinger_id)
            .bind(&swinger.email)
            .bind(&swinger.name)
            .bind(&swinger.json_data)
            .fetch_one(self.db.pool()?)
            .await?;
        Ok(row)
    }

    async fn delete(&self, key: &SwingerKey) -> Result<Swinger, DatabaseError> {
        let sql = format!(
            "DELETE FROM swingers WHERE {} RETURNING {}",
            swinger_filter(key),
            SWINGER_COLUMNS
        );
        let query = sqlx::query_as::<_, Swinger>(&sql);
        bind_swinger_key!(query, key)
            .fetch_optional(self.db.pool()?)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Swinger with {} not found", key)))
    }
}

pub struct PgChatRepository {
    db: DatabaseManager,
}

impl PgChatRepository {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn append(
        &self,
        chat_id: Uuid,
        user_email: &str,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatMessage, DatabaseError> {
        let message = sqlx::query_as::<_, ChatMessage>(
            "INSERT INTO chat_messages (chat_id, user_email, role, content) VALUES ($1, $2, $3, $4) \
             RETURNING id, chat_id, user_email, role, content, created_at",
        )
        .bind(chat_id)
        .bind(user_email)
        .bind(role.as_str())
        .bind(content)
        .fetch_one(self.db.pool()?)
        .await?;
        Ok(message)
    }

    async fn history(&self, chat_id: Uuid) -> Result<Vec<ChatMessage>, DatabaseError> {
        let messages = sqlx::query_as::<_, ChatMessage>(
            "SELECT id, chat_id, user_email, role, content, created_at FROM chat_messages \
             WHERE chat_id = $1 ORDER BY created_at",
        )
        .bind(chat_id)
        .fetch_all(self.db.pool()?)
        .await?;
        Ok(messages)
    }
}
