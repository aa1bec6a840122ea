//! In-memory stand-ins and token helpers for unit and router tests.

mod routes;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, jwk::JwkSet, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::cognito::{AuthTokens, CognitoError, CognitoUser, IdentityProvider, SignUpOutcome, UserAttribute};
use crate::auth::oauth::OAuthClient;
use crate::auth::{JwksEndpoints, JwksSource, TokenVerifier};
use crate::config::AppConfig;
use crate::database::models::{
    ApiKey, ChatMessage, ChatRole, NewSwinger, NewUser, Swinger, SwingerKey, SwingerPatch, User, UserPatch,
};
use crate::database::{
    ApiKeyRepository, ChatRepository, DatabaseError, DatabaseManager, SwingerRepository, UserRepository,
};
use crate::services::ai::gemini::{first_prompt, Gemini};
use crate::services::ai::{AiError, ChatGpt};
use crate::services::dynamodb::{CreateTableRequest, CreatedTable, DynamoError, DynamoStore};
use crate::services::{FileService, LogHistory, StoredCommand, SwingerImporter, SystemMonitor};
use crate::state::{AppState, LOG_HISTORY_SIZE};

const PRIMARY_KEY_PEM: &[u8] = include_bytes!("../../tests/fixtures/rsa_primary.pem");
const ROGUE_KEY_PEM: &[u8] = include_bytes!("../../tests/fixtures/rsa_rogue.pem");

/// Public half of `rsa_primary.pem`, published under kid `primary-key`
pub fn jwks_fixture() -> JwkSet {
    serde_json::from_str(include_str!("../../tests/fixtures/jwks_primary.json")).expect("valid JWKS fixture")
}

#[derive(Debug, Clone)]
pub struct TestToken {
    pub sub: String,
    pub username: Option<String>,
    pub cognito_username: Option<String>,
    pub email: Option<String>,
    pub iss: Option<String>,
    pub kid: Option<String>,
    pub expires_in_secs: i64,
}

impl Default for TestToken {
    fn default() -> Self {
        Self {
            sub: "user-123".to_string(),
            username: None,
            cognito_username: None,
            email: None,
            iss: None,
            kid: Some("primary-key".to_string()),
            expires_in_secs: 3600,
        }
    }
}

fn sign(token: &TestToken, pem: &[u8]) -> String {
    let now = Utc::now().timestamp();
    let mut claims = Map::new();
    claims.insert("sub".into(), json!(token.sub));
    claims.insert("iat".into(), json!(now));
    claims.insert("exp".into(), json!(now + token.expires_in_secs));
    if let Some(iss) = &token.iss {
        claims.insert("iss".into(), json!(iss));
    }
    if let Some(username) = &token.username {
        claims.insert("username".into(), json!(username));
    }
    if let Some(username) = &token.cognito_username {
        claims.insert("cognito:username".into(), json!(username));
    }
    if let Some(email) = &token.email {
        claims.insert("email".into(), json!(email));
    }

    let mut header = Header::new(Algorithm::RS256);
    header.kid = token.kid.clone();
    let key = EncodingKey::from_rsa_pem(pem).expect("valid RSA fixture");
    encode(&header, &Value::Object(claims), &key).expect("token encodes")
}

/// RS256 token signed by the key in `jwks_fixture()`
pub fn sign_token(token: &TestToken) -> String {
    sign(token, PRIMARY_KEY_PEM)
}

/// Same kid as the fixture, different private key
pub fn sign_with_rogue_key(token: &TestToken) -> String {
    sign(token, ROGUE_KEY_PEM)
}

fn not_found(what: impl std::fmt::Display) -> DatabaseError {
    DatabaseError::NotFound(format!("{} not found", what))
}

#[derive(Default)]
pub struct InMemoryUsers {
    rows: Mutex<Vec<User>>,
}

impl InMemoryUsers {
    fn get(&self, id: Uuid) -> Option<User> {
        self.rows.lock().unwrap().iter().find(|u| u.id == id).cloned()
    }

    fn insert(&self, sub: &str, username: &str, email: Option<&str>, provider: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            sub: sub.to_string(),
            username: username.to_string(),
            email: email.map(str::to_string),
            provider: provider.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(user.clone());
        user
    }
}

#[async_trait]
impl UserRepository for InMemoryUsers {
    async fn upsert_identity(
        &self,
        sub: &str,
        username: &str,
        email: Option<&str>,
        provider: &str,
    ) -> Result<User, DatabaseError> {
        {
            let mut rows = self.rows.lock().unwrap();
            if let Some(user) = rows.iter_mut().find(|u| u.sub == sub) {
                user.username = username.to_string();
                user.email = email.map(str::to_string);
                user.provider = provider.to_string();
                user.updated_at = Utc::now();
                return Ok(user.clone());
            }
        }
        Ok(self.insert(sub, username, email, provider))
    }

    async fn find(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.get(id))
    }

    async fn list(&self, limit: Option<i64>) -> Result<Vec<User>, DatabaseError> {
        let rows = self.rows.lock().unwrap();
        let take = limit.map_or(rows.len(), |l| l.max(0) as usize);
        Ok(rows.iter().take(take).cloned().collect())
    }

    async fn count(&self) -> Result<i64, DatabaseError> {
        Ok(self.rows.lock().unwrap().len() as i64)
    }

    async fn create(&self, user: NewUser) -> Result<User, DatabaseError> {
        if self.rows.lock().unwrap().iter().any(|u| u.sub == user.sub) {
            return Err(DatabaseError::Conflict(format!("User {} already exists", user.sub)));
        }
        Ok(self.insert(&user.sub, &user.username, user.email.as_deref(), &user.provider))
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<User, DatabaseError> {
        let mut rows = self.rows.lock().unwrap();
        let user = rows
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| not_found(format!("User {}", id)))?;
        if let Some(username) = patch.username {
            user.username = username;
        }
        if patch.email.is_some() {
            user.email = patch.email;
        }
        if let Some(provider) = patch.provider {
            user.provider = provider;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<User, DatabaseError> {
        let mut rows = self.rows.lock().unwrap();
        let index = rows
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| not_found(format!("User {}", id)))?;
        Ok(rows.remove(index))
    }
}

pub struct InMemoryApiKeys {
    users: Arc<InMemoryUsers>,
    keys: Mutex<Vec<ApiKey>>,
}

impl InMemoryApiKeys {
    pub fn new(users: Arc<InMemoryUsers>) -> Self {
        Self {
            users,
            keys: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ApiKeyRepository for InMemoryApiKeys {
    async fn insert(&self, user_id: Uuid, key_hash: &str, label: Option<&str>) -> Result<ApiKey, DatabaseError> {
        let key = ApiKey {
            id: Uuid::new_v4(),
            key_hash: key_hash.to_string(),
            user_id,
            label: label.map(str::to_string),
            created_at: Utc::now(),
        };
        self.keys.lock().unwrap().push(key.clone());
        Ok(key)
    }

    async fn find_owner(&self, key_hash: &str) -> Result<Option<User>, DatabaseError> {
        let owner = self
            .keys
            .lock()
            .unwrap()
            .iter()
            .find(|k| k.key_hash == key_hash)
            .map(|k| k.user_id);
        Ok(owner.and_then(|id| self.users.get(id)))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ApiKey>, DatabaseError> {
        Ok(self
            .keys
            .lock()
            .unwrap()
            .iter()
            .filter(|k| k.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), DatabaseError> {
        let mut keys = self.keys.lock().unwrap();
        let before = keys.len();
        keys.retain(|k| !(k.id == id && k.user_id == user_id));
        if keys.len() == before {
            return Err(not_found(format!("API key {}", id)));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemorySwingers {
    rows: Mutex<Vec<Swinger>>,
}

fn matches_key(swinger: &Swinger, key: &SwingerKey) -> bool {
    match key {
        SwingerKey::Id(id) => swinger.id == *id,
        SwingerKey::SwingerId(swinger_id) => swinger.swinger_id == *swinger_id,
    }
}

#[async_trait]
impl SwingerRepository for InMemorySwingers {
    async fn count(&self) -> Result<i64, DatabaseError> {
        Ok(self.rows.lock().unwrap().len() as i64)
    }

    async fn create(&self, swinger: NewSwinger) -> Result<Swinger, DatabaseError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|s| s.swinger_id == swinger.swinger_id) {
            return Err(DatabaseError::Conflict(format!(
                "Swinger {} already exists",
                swinger.swinger_id
            )));
        }
        let now = Utc::now();
        let row = Swinger {
            id: Uuid::new_v4(),
            swinger_id: swinger.swinger_id,
            email: swinger.email,
            name: swinger.name,
            json_data: swinger.json_data,
            created_at: now,
            updated_at: now,
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, key: &SwingerKey, patch: SwingerPatch) -> Result<Swinger, DatabaseError> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|s| matches_key(s, key))
            .ok_or_else(|| not_found(format!("Swinger with {}", key)))?;
        if let Some(email) = patch.email {
            row.email = email;
        }
        if let Some(name) = patch.name {
            row.name = name;
        }
        if patch.json_data.is_some() {
            row.json_data = patch.json_data;
        }
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn list(&self, limit: Option<i64>) -> Result<Vec<Swinger>, DatabaseError> {
        let rows = self.rows.lock().unwrap();
        let take = limit.map_or(rows.len(), |l| l.max(0) as usize);
        Ok(rows.iter().take(take).cloned().collect())
    }

    async fn find(&self, key: &SwingerKey) -> Result<Option<Swinger>, DatabaseError> {
        Ok(self.rows.lock().unwrap().iter().find(|s| matches_key(s, key)).cloned())
    }

    async fn upsert(&self, swinger: NewSwinger) -> Result<Swinger, DatabaseError> {
        {
            let mut rows = self.rows.lock().unwrap();
            if let Some(row) = rows.iter_mut().find(|s| s.swinger_id == swinger.swinger_id) {
                row.json_data = swinger.json_data;
                row.updated_at = Utc::now();
                return Ok(row.clone());
            }
        }
        self.create(swinger).await
    }

    async fn delete(&self, key: &SwingerKey) -> Result<Swinger, DatabaseError> {
        let mut rows = self.rows.lock().unwrap();
        let index = rows
            .iter()
            .position(|s| matches_key(s, key))
            .ok_or_else(|| not_found(format!("Swinger with {}", key)))?;
        Ok(rows.remove(index))
    }
}

#[derive(Default)]
pub struct InMemoryChats {
    pub messages: Mutex<Vec<ChatMessage>>,
}

#[async_trait]
impl ChatRepository for InMemoryChats {
    async fn append(
        &self,
        chat_id: Uuid,
        user_email: &str,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatMessage, DatabaseError> {
        let message = ChatMessage {
            id: Uuid::new_v4(),
            chat_id,
            user_email: user_email.to_string(),
            role: role.as_str().to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.messages.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn history(&self, chat_id: Uuid) -> Result<Vec<ChatMessage>, DatabaseError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect())
    }
}

/// Accepts `user@example.com` / `password` and the access token it hands out
pub struct FakeIdentity {
    users: Mutex<Vec<CognitoUser>>,
}

pub const FAKE_EMAIL: &str = "user@example.com";
pub const FAKE_PASSWORD: &str = "password";
pub const FAKE_ACCESS_TOKEN: &str = "access-token";

impl Default for FakeIdentity {
    fn default() -> Self {
        Self {
            users: Mutex::new(vec![CognitoUser {
                username: FAKE_EMAIL.to_string(),
                attributes: vec![UserAttribute {
                    name: "email".to_string(),
                    value: FAKE_EMAIL.to_string(),
                }],
                enabled: true,
                user_status: Some("CONFIRMED".to_string()),
                created_at: None,
            }]),
        }
    }
}

impl FakeIdentity {
    fn find(&self, username: &str) -> Result<CognitoUser, CognitoError> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| CognitoError::UserNotFound("User does not exist.".to_string()))
    }

    fn tokens() -> AuthTokens {
        AuthTokens {
            access_token: Some(FAKE_ACCESS_TOKEN.to_string()),
            id_token: Some("id-token".to_string()),
            refresh_token: Some("refresh-token".to_string()),
            expires_in: 3600,
            token_type: Some("Bearer".to_string()),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_up(&self, email: &str, _password: &str, name: &str) -> Result<SignUpOutcome, CognitoError> {
        self.admin_create_user(email, name).await?;
        Ok(SignUpOutcome {
            user_confirmed: false,
            user_sub: Uuid::new_v4().to_string(),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthTokens, CognitoError> {
        if email == FAKE_EMAIL && password == FAKE_PASSWORD {
            Ok(Self::tokens())
        } else {
            Err(CognitoError::NotAuthorized("Incorrect username or password.".to_string()))
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthTokens, CognitoError> {
        if refresh_token == "refresh-token" {
            Ok(AuthTokens {
                refresh_token: None,
                ..Self::tokens()
            })
        } else {
            Err(CognitoError::NotAuthorized("Invalid Refresh Token".to_string()))
        }
    }

    async fn global_sign_out(&self, access_token: &str) -> Result<(), CognitoError> {
        if access_token == FAKE_ACCESS_TOKEN {
            Ok(())
        } else {
            Err(CognitoError::NotAuthorized("Access Token has been revoked".to_string()))
        }
    }

    async fn admin_sign_out(&self, username: &str) -> Result<(), CognitoError> {
        self.find(username).map(|_| ())
    }

    async fn admin_create_user(&self, email: &str, name: &str) -> Result<CognitoUser, CognitoError> {
        if self.find(email).is_ok() {
            return Err(CognitoError::UsernameExists("User account already exists".to_string()));
        }
        let user = CognitoUser {
            username: email.to_string(),
            attributes: vec![
                UserAttribute {
                    name: "email".to_string(),
                    value: email.to_string(),
                },
                UserAttribute {
                    name: "name".to_string(),
                    value: name.to_string(),
                },
            ],
            enabled: true,
            user_status: Some("FORCE_CHANGE_PASSWORD".to_string()),
            created_at: Some(Utc::now()),
        };
        self.users.lock().unwrap().push(user.clone());
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<CognitoUser>, CognitoError> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn admin_get_user(&self, username: &str) -> Result<CognitoUser, CognitoError> {
        self.find(username)
    }

    async fn admin_update_attributes(&self, username: &str, attributes: &[UserAttribute]) -> Result<(), CognitoError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(|| CognitoError::UserNotFound("User does not exist.".to_string()))?;
        for attribute in attributes {
            user.attributes.retain(|a| a.name != attribute.name);
            user.attributes.push(attribute.clone());
        }
        Ok(())
    }

    async fn admin_delete_user(&self, username: &str) -> Result<(), CognitoError> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.username != username);
        if users.len() == before {
            return Err(CognitoError::UserNotFound("User does not exist.".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeDynamo {
    pub commands: Mutex<Vec<StoredCommand>>,
}

#[async_trait]
impl DynamoStore for FakeDynamo {
    async fn store_command(&self, command: &str) -> Result<StoredCommand, DynamoError> {
        let stored = StoredCommand::now(command);
        self.commands.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn stored_commands(&self) -> Result<Vec<StoredCommand>, DynamoError> {
        Ok(self.commands.lock().unwrap().clone())
    }

    async fn list_tables(&self) -> Result<Vec<String>, DynamoError> {
        Ok(vec!["commands".to_string()])
    }

    async fn scan_table(&self, table_name: &str) -> Result<Vec<Value>, DynamoError> {
        if table_name != "commands" {
            return Err(DynamoError::InvalidRequest(format!("Table not found: {}", table_name)));
        }
        let commands = self.commands.lock().unwrap();
        Ok(commands.iter().map(|c| json!(c)).collect())
    }

    async fn create_table(&self, request: CreateTableRequest) -> Result<CreatedTable, DynamoError> {
        request.validate()?;
        Ok(CreatedTable {
            table_name: request.table_name,
            table_status: Some("CREATING".to_string()),
        })
    }
}

/// Echoes the question back
pub struct EchoChatGpt;

#[async_trait]
impl ChatGpt for EchoChatGpt {
    async fn ask(&self, question: &str) -> Result<String, AiError> {
        if question.trim().is_empty() {
            return Err(AiError::EmptyInput);
        }
        Ok(format!("echo: {}", question))
    }
}

/// Answers every prompt with `gemini: <prompt>`
pub struct EchoGemini;

#[async_trait]
impl Gemini for EchoGemini {
    async fn generate_content(&self, request: &Value) -> Result<Value, AiError> {
        let prompt = first_prompt(request)
            .filter(|p| !p.trim().is_empty())
            .ok_or(AiError::EmptyInput)?;
        Ok(json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": format!("gemini: {}", prompt) }] } }]
        }))
    }
}

/// State wired to fakes, plus handles for inspecting them
pub struct TestApp {
    pub state: AppState,
    pub users: Arc<InMemoryUsers>,
    pub swingers: Arc<InMemorySwingers>,
    pub chats: Arc<InMemoryChats>,
    pub dynamo: Arc<FakeDynamo>,
}

pub async fn test_app() -> TestApp {
    let config = AppConfig::development();
    let http = reqwest::Client::new();

    let verifier = TokenVerifier::new(JwksEndpoints::default(), http.clone());
    verifier.preload(JwksSource::Cognito, jwks_fixture()).await;

    let users = Arc::new(InMemoryUsers::default());
    let swingers = Arc::new(InMemorySwingers::default());
    let chats = Arc::new(InMemoryChats::default());
    let dynamo = Arc::new(FakeDynamo::default());

    let state = AppState {
        db: DatabaseManager::disconnected(),
        verifier: Arc::new(verifier),
        identity: Arc::new(FakeIdentity::default()),
        oauth: OAuthClient::new(http.clone(), config.oauth.clone(), config.aws.clone()),
        users: users.clone(),
        api_keys: Arc::new(InMemoryApiKeys::new(users.clone())),
        swingers: swingers.clone(),
        chats: chats.clone(),
        dynamo: dynamo.clone(),
        files: FileService::new(config.files.excluded_folders.clone()),
        chatgpt: Arc::new(EchoChatGpt),
        gemini: Arc::new(EchoGemini),
        importer: Arc::new(SwingerImporter::new(http.clone(), swingers.clone())),
        system: Arc::new(SystemMonitor::with_public_ip(http, "203.0.113.7")),
        log_history: Arc::new(LogHistory::new(LOG_HISTORY_SIZE)),
        command_events: broadcast::channel(16).0,
        config: Arc::new(config),
    };

    TestApp {
        state,
        users,
        swingers,
        chats,
        dynamo,
    }
}
