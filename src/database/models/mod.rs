pub mod api_key;
pub mod chat;
pub mod swinger;
pub mod user;

pub use api_key::ApiKey;
pub use chat::{ChatMessage, ChatRole};
pub use swinger::{NewSwinger, Swinger, SwingerKey, SwingerPatch, SwingerSummary};
pub use user::{NewUser, User, UserPatch};
