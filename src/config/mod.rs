use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub aws: AwsConfig,
    pub identity: IdentityConfig,
    pub oauth: OAuthConfig,
    pub ai: AiConfig,
    pub files: FileConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Seconds between `systemStats` pushes on a WebSocket connection
    pub stats_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    pub region: String,
    pub endpoint_url: Option<String>,
    pub user_pool_id: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    pub cognito_domain: String,
    pub redirect_uri: String,
    pub dynamodb_table: String,
}

/// Where each identity provider publishes its signing keys
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub auth0_domain: Option<String>,
    pub azure_tenant_id: Option<String>,
    pub cognito_jwks_url: Option<String>,
    pub auth0_jwks_url: Option<String>,
    pub google_jwks_url: Option<String>,
    pub azure_jwks_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    pub api_url: String,
    pub google_client_id: String,
    #[serde(skip_serializing)]
    pub google_client_secret: String,
    pub google_callback_url: Option<String>,
    pub github_client_id: String,
    #[serde(skip_serializing)]
    pub github_client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(skip_serializing)]
    pub openai_api_key: String,
    pub openai_api_url: String,
    pub openai_model: String,
    pub openai_max_retries: u32,
    pub openai_retry_base_ms: u64,
    #[serde(skip_serializing)]
    pub gemini_api_key: String,
    pub gemini_api_url: String,
    pub gemini_model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    pub excluded_folders: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub cookie_secure: bool,
    pub cookie_max_age_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SERVER_STATS_INTERVAL_SECS") {
            self.server.stats_interval_secs = v.parse().unwrap_or(self.server.stats_interval_secs);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // AWS overrides
        if let Ok(v) = env::var("AWS_REGION") {
            self.aws.region = v;
        }
        self.aws.endpoint_url = env::var("AWS_ENDPOINT_URL").ok().or(self.aws.endpoint_url);
        if let Ok(v) = env::var("AWS_USER_POOL_ID").or_else(|_| env::var("COGNITO_USER_POOL_ID")) {
            self.aws.user_pool_id = v;
        }
        if let Ok(v) = env::var("AWS_USER_POOL_WEB_CLIENT_ID") {
            self.aws.client_id = v;
        }
        self.aws.client_secret = env::var("COGNITO_CLIENT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .or(self.aws.client_secret);
        if let Ok(v) = env::var("COGNITO_DOMAIN") {
            self.aws.cognito_domain = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("COGNITO_REDIRECT_URI") {
            self.aws.redirect_uri = v;
        }
        if let Ok(v) = env::var("DYNAMODB_TABLE_NAME") {
            self.aws.dynamodb_table = v;
        }

        // Identity provider overrides
        self.identity.auth0_domain = env::var("AUTH0_DOMAIN").ok().or(self.identity.auth0_domain);
        self.identity.azure_tenant_id = env::var("AZURE_TENANT_ID").ok().or(self.identity.azure_tenant_id);
        self.identity.cognito_jwks_url = env::var("JWKS_URL_COGNITO").ok().or(self.identity.cognito_jwks_url);
        self.identity.auth0_jwks_url = env::var("JWKS_URL_AUTH0").ok().or(self.identity.auth0_jwks_url);
        self.identity.google_jwks_url = env::var("JWKS_URL_GOOGLE").ok().or(self.identity.google_jwks_url);
        self.identity.azure_jwks_url = env::var("JWKS_URL_AZURE").ok().or(self.identity.azure_jwks_url);

        // OAuth overrides
        if let Ok(v) = env::var("API_URL") {
            self.oauth.api_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("GOOGLE_CLIENT_ID") {
            self.oauth.google_client_id = v;
        }
        if let Ok(v) = env::var("GOOGLE_CLIENT_SECRET") {
            self.oauth.google_client_secret = v;
        }
        self.oauth.google_callback_url = env::var("GOOGLE_CALLBACK_URL").ok().or(self.oauth.google_callback_url);
        if let Ok(v) = env::var("GITHUB_CLIENT_ID") {
            self.oauth.github_client_id = v;
        }
        if let Ok(v) = env::var("GITHUB_CLIENT_SECRET") {
            self.oauth.github_client_secret = v;
        }

        // AI overrides
        if let Ok(v) = env::var("OPENAI_API_KEY") {
            self.ai.openai_api_key = v;
        }
        if let Ok(v) = env::var("OPENAI_API_URL") {
            self.ai.openai_api_url = v;
        }
        if let Ok(v) = env::var("OPENAI_MODEL") {
            self.ai.openai_model = v;
        }
        if let Ok(v) = env::var("OPENAI_MAX_RETRIES") {
            self.ai.openai_max_retries = v.parse().unwrap_or(self.ai.openai_max_retries);
        }
        if let Ok(v) = env::var("OPENAI_RETRY_BASE_MS") {
            self.ai.openai_retry_base_ms = v.parse().unwrap_or(self.ai.openai_retry_base_ms);
        }
        if let Ok(v) = env::var("GEMINI_API_KEY") {
            self.ai.gemini_api_key = v;
        }
        if let Ok(v) = env::var("GEMINI_API_URL") {
            self.ai.gemini_api_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("GEMINI_MODEL") {
            self.ai.gemini_model = v;
        }

        // File browser overrides
        if let Ok(v) = env::var("FILE_EXCLUDED_FOLDERS") {
            self.files.excluded_folders = split_list(&v);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }
        if let Ok(v) = env::var("SECURITY_COOKIE_SECURE") {
            self.security.cookie_secure = v.parse().unwrap_or(self.security.cookie_secure);
        }
        if let Ok(v) = env::var("SECURITY_COOKIE_MAX_AGE_HOURS") {
            self.security.cookie_max_age_hours = v.parse().unwrap_or(self.security.cookie_max_age_hours);
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                stats_interval_secs: 1,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            aws: AwsConfig::default(),
            identity: IdentityConfig::default(),
            oauth: OAuthConfig::default(),
            ai: AiConfig::default(),
            files: FileConfig::default(),
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                    "http://localhost:4173".to_string(),
                    "http://localhost:5000".to_string(),
                ],
                cookie_secure: false,
                cookie_max_age_hours: 24,
            },
        }
    }

    fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.max_connections = 20;
        config.database.connection_timeout = 10;
        config.security.cors_origins = vec!["https://staging.example.com".to_string()];
        config.security.cookie_secure = true;
        config
    }

    fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.database.max_connections = 50;
        config.database.connection_timeout = 5;
        config.security.cors_origins = vec!["https://app.example.com".to_string()];
        config.security.cookie_secure = true;
        config
    }
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint_url: None,
            user_pool_id: String::new(),
            client_id: String::new(),
            client_secret: None,
            cognito_domain: String::new(),
            redirect_uri: String::new(),
            dynamodb_table: "commands".to_string(),
        }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3000".to_string(),
            google_client_id: String::new(),
            google_client_secret: String::new(),
            google_callback_url: None,
            github_client_id: String::new(),
            github_client_secret: String::new(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            openai_model: "gpt-3.5-turbo".to_string(),
            openai_max_retries: 5,
            openai_retry_base_ms: 1000,
            gemini_api_key: String::new(),
            gemini_api_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            gemini_model: "gemini-1.5-flash".to_string(),
        }
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            excluded_folders: vec!["node_modules".to_string(), "dist".to_string(), "target".to_string()],
        }
    }
}

impl OAuthConfig {
    pub fn google_callback(&self) -> String {
        self.google_callback_url
            .clone()
            .unwrap_or_else(|| format!("{}/auth/google/callback", self.api_url))
    }

    pub fn github_callback(&self) -> String {
        format!("{}/auth/github/callback", self.api_url)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
