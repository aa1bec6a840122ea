use std::sync::Arc;

use aws_config::{BehaviorVersion, Region};
use tokio::sync::broadcast;

use crate::auth::cognito::{CognitoIdentity, IdentityProvider};
use crate::auth::oauth::OAuthClient;
use crate::auth::{JwksEndpoints, TokenVerifier};
use crate::config::{AppConfig, AwsConfig};
use crate::database::{
    ApiKeyRepository, ChatRepository, DatabaseError, DatabaseManager, PgApiKeyRepository, PgChatRepository,
    PgSwingerRepository, PgUserRepository, SwingerRepository, UserRepository,
};
use crate::services::ai::{ChatGpt, Gemini, GeminiClient, OpenAiClient};
use crate::services::{
    DynamoService, DynamoStore, FileService, LogHistory, StoredCommand, SwingerImporter, SystemMonitor,
};

/// Capacity of the `storedCommands` fan-out. Slow sockets skip stale snapshots.
const COMMAND_EVENT_CAPACITY: usize = 16;

/// Entries kept for `GET /log/history`
pub const LOG_HISTORY_SIZE: usize = 200;

/// Everything a handler can reach, cloned per request
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DatabaseManager,
    pub verifier: Arc<TokenVerifier>,
    pub identity: Arc<dyn IdentityProvider>,
    pub oauth: OAuthClient,
    pub users: Arc<dyn UserRepository>,
    pub api_keys: Arc<dyn ApiKeyRepository>,
    pub swingers: Arc<dyn SwingerRepository>,
    pub chats: Arc<dyn ChatRepository>,
    pub dynamo: Arc<dyn DynamoStore>,
    pub files: FileService,
    pub chatgpt: Arc<dyn ChatGpt>,
    pub gemini: Arc<dyn Gemini>,
    pub importer: Arc<SwingerImporter>,
    pub system: Arc<SystemMonitor>,
    pub log_history: Arc<LogHistory>,
    pub command_events: broadcast::Sender<Vec<StoredCommand>>,
}

impl AppState {
    /// Wire production clients from configuration
    pub async fn from_config(config: AppConfig) -> Result<Self, DatabaseError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let db = DatabaseManager::connect_lazy(&config.database)?;
        let sdk_config = load_aws(&config.aws).await;

        let verifier = TokenVerifier::new(
            JwksEndpoints::from_config(&config.aws, &config.identity),
            http.clone(),
        );
        let identity = CognitoIdentity::new(
            aws_sdk_cognitoidentityprovider::Client::new(&sdk_config),
            &config.aws,
        );
        let dynamo = DynamoService::new(
            aws_sdk_dynamodb::Client::new(&sdk_config),
            config.aws.dynamodb_table.clone(),
        );
        let swingers: Arc<dyn SwingerRepository> = Arc::new(PgSwingerRepository::new(db.clone()));

        Ok(Self {
            oauth: OAuthClient::new(http.clone(), config.oauth.clone(), config.aws.clone()),
            verifier: Arc::new(verifier),
            identity: Arc::new(identity),
            users: Arc::new(PgUserRepository::new(db.clone())),
            api_keys: Arc::new(PgApiKeyRepository::new(db.clone())),
            chats: Arc::new(PgChatRepository::new(db.clone())),
            importer: Arc::new(SwingerImporter::new(http.clone(), swingers.clone())),
            swingers,
            dynamo: Arc::new(dynamo),
            files: FileService::new(config.files.excluded_folders.clone()),
            chatgpt: Arc::new(OpenAiClient::new(http.clone(), &config.ai)),
            gemini: Arc::new(GeminiClient::new(http.clone(), &config.ai)),
            system: Arc::new(SystemMonitor::new(http)),
            log_history: Arc::new(LogHistory::new(LOG_HISTORY_SIZE)),
            command_events: broadcast::channel(COMMAND_EVENT_CAPACITY).0,
            config: Arc::new(config),
            db,
        })
    }
}

async fn load_aws(aws: &AwsConfig) -> aws_config::SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(aws.region.clone()));
    if let Some(endpoint) = &aws.endpoint_url {
        loader = loader.endpoint_url(endpoint);
    }
    loader.load().await
}
