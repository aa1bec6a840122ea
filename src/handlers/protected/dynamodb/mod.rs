// handlers/protected/dynamodb/mod.rs - Command log and table passthrough

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::dynamodb::{CreateTableRequest, CreatedTable};
use crate::services::StoredCommand;
use crate::state::AppState;
use crate::websocket;

#[derive(Debug, Default, Deserialize)]
pub struct StoreCommandRequest {
    #[serde(default)]
    pub command: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableNames {
    pub table_names: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TableItems {
    pub items: Vec<Value>,
}

/// POST /api/dynamodb/store-command - Append to the command log
pub async fn store_command(
    State(state): State<AppState>,
    Json(body): Json<StoreCommandRequest>,
) -> ApiResult<StoredCommand> {
    let command = body.command.trim();
    if command.is_empty() {
        return Err(ApiError::bad_request("command is required"));
    }
    let stored = state.dynamo.store_command(command).await?;
    websocket::publish_stored_commands(&state).await;
    Ok(ApiResponse::created(stored))
}

/// GET /api/dynamodb/stored-commands - Whole command log, oldest first
pub async fn stored_commands(State(state): State<AppState>) -> ApiResult<Vec<StoredCommand>> {
    Ok(ApiResponse::success(state.dynamo.stored_commands().await?))
}

/// GET /api/dynamodb/tables - Table names in the account and region
pub async fn list_tables(State(state): State<AppState>) -> ApiResult<TableNames> {
    let table_names = state.dynamo.list_tables().await?;
    Ok(ApiResponse::success(TableNames { table_names }))
}

/// GET /api/dynamodb/tables/:name - Every item of a table as plain JSON
pub async fn scan_table(State(state): State<AppState>, Path(name): Path<String>) -> ApiResult<TableItems> {
    let items = state.dynamo.scan_table(&name).await?;
    Ok(ApiResponse::success(TableItems { items }))
}

/// POST /api/dynamodb/tables - Create a table
pub async fn create_table(
    State(state): State<AppState>,
    Json(body): Json<CreateTableRequest>,
) -> ApiResult<CreatedTable> {
    Ok(ApiResponse::created(state.dynamo.create_table(body).await?))
}
