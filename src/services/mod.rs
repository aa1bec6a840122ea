pub mod ai;
pub mod dynamodb;
pub mod files;
pub mod log_history;
pub mod swinger_import;
pub mod system;

pub use dynamodb::{DynamoService, DynamoStore, StoredCommand};
pub use files::FileService;
pub use log_history::LogHistory;
pub use swinger_import::SwingerImporter;
pub use system::SystemMonitor;
