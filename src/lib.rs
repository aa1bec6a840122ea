pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod state;
pub mod websocket;

#[cfg(test)]
pub mod testing;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::auth::api_key::API_KEY_HEADER;
use crate::config::SecurityConfig;
use crate::handlers::{protected, public};
use crate::middleware::require_auth;
use crate::state::AppState;

/// Full HTTP surface with shared state applied
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.security);

    Router::new()
        .merge(public_routes())
        .merge(protected_routes().route_layer(from_fn_with_state(state.clone(), require_auth)))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn public_routes() -> Router<AppState> {
    use public::{auth, oauth};

    Router::new()
        .route("/", get(public::root::root))
        .route("/health", get(public::root::health))
        .route("/websocket/status", get(public::root::websocket_status))
        .route("/ws", get(websocket::ws_handler))
        // Cognito sessions
        .route("/auth/signup", post(auth::signup_post))
        .route("/auth/signin", post(auth::signin_post))
        .route("/auth/refresh-token", post(auth::refresh_post))
        .route("/auth/logout", post(auth::logout_post))
        // OAuth
        .route("/auth/google", get(oauth::google::redirect))
        .route("/auth/google/callback", get(oauth::google::callback))
        .route("/auth/google/login", post(oauth::google::login))
        .route("/auth/google/userinfo", post(oauth::google::userinfo))
        .route("/auth/github", get(oauth::github::redirect))
        .route("/auth/github/callback", get(oauth::github::callback))
}

fn protected_routes() -> Router<AppState> {
    use protected::{ai, auth, dynamodb, files, log, prisma, swingers, users};

    Router::new()
        // Session administration and API keys
        .route("/auth/admin/logout/:username", post(auth::admin_logout_post))
        .route(
            "/auth/api-keys",
            get(auth::api_keys::list).post(auth::api_keys::create),
        )
        .route("/auth/api-keys/:id", delete(auth::api_keys::revoke))
        // Users
        .route("/api/users/me", get(users::profile::me))
        .route("/api/users", get(users::admin::list).post(users::admin::create))
        .route(
            "/api/users/:username",
            get(users::admin::show)
                .put(users::admin::update)
                .delete(users::admin::delete),
        )
        // Files
        .route("/file/list", get(files::list))
        .route("/file/content", get(files::content))
        .route("/file/create", post(files::create))
        .route("/file/read", get(files::read))
        .route("/file/delete", delete(files::delete))
        // DynamoDB
        .route("/api/dynamodb/store-command", post(dynamodb::store_command))
        .route("/api/dynamodb/stored-commands", get(dynamodb::stored_commands))
        .route(
            "/api/dynamodb/tables",
            get(dynamodb::list_tables).post(dynamodb::create_table),
        )
        .route("/api/dynamodb/tables/:name", get(dynamodb::scan_table))
        // Swingers
        .route("/swingers", get(swingers::record::list).post(swingers::record::create))
        .route("/swingers/count", get(swingers::record::count))
        .route("/swingers/fetch-data", post(swingers::fetch_data_post))
        .route(
            "/swingers/:swinger_id",
            get(swingers::record::show).put(swingers::record::update),
        )
        // Generic model dispatch
        .route("/api/prisma", post(prisma::prisma_post))
        // Client log relay
        .route("/log", post(log::log_post))
        .route("/log/history", get(log::history))
        // AI proxies
        .route("/api/chatgpt/ask", post(ai::chatgpt::ask_post))
        .route("/google-gemini/generate-content", post(ai::gemini::generate_content_post))
        .route("/google-gemini/process-input", post(ai::gemini::process_input_post))
        .route("/google-gemini/chats/:chat_id", get(ai::gemini::chat_history))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(API_KEY_HEADER),
        ])
}
