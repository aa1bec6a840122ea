pub mod manager;
pub mod models;
pub mod postgres;
pub mod repository;

pub use manager::{DatabaseError, DatabaseManager};
pub use postgres::{PgApiKeyRepository, PgChatRepository, PgSwingerRepository, PgUserRepository};
pub use repository::{ApiKeyRepository, ChatRepository, SwingerRepository, UserRepository};
