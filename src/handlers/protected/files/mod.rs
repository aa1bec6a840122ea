// handlers/protected/files/mod.rs - Browse and edit files on the server host

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::files::{FileContent, FileEntry, FileRead, FileWritten};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub directory: Option<String>,
    #[serde(default)]
    pub recursive: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentQuery {
    pub file_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateFileRequest {
    pub path: Option<String>,
    pub content: Option<String>,
}

/// GET /file/list - Directory tree, children included when `recursive=true`
pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Vec<FileEntry>> {
    let entries = state.files.list(query.directory.as_deref(), query.recursive).await?;
    Ok(ApiResponse::success(entries))
}

/// GET /file/content - Text, or base64 for images
pub async fn content(State(state): State<AppState>, Query(query): Query<ContentQuery>) -> ApiResult<FileContent> {
    Ok(ApiResponse::success(state.files.content(query.file_path.as_deref()).await?))
}

/// POST /file/create - Create or overwrite a file, making parent directories
pub async fn create(State(state): State<AppState>, Json(body): Json<CreateFileRequest>) -> ApiResult<FileWritten> {
    let written = state
        .files
        .create(body.path.as_deref(), body.content.as_deref())
        .await?;
    Ok(ApiResponse::created(written))
}

/// GET /file/read - Text content of one file
pub async fn read(State(state): State<AppState>, Query(query): Query<PathQuery>) -> ApiResult<FileRead> {
    Ok(ApiResponse::success(state.files.read(query.path.as_deref()).await?))
}

/// DELETE /file/delete - Remove a file or directory tree
pub async fn delete(State(state): State<AppState>, Query(query): Query<PathQuery>) -> ApiResult<FileWritten> {
    Ok(ApiResponse::success(state.files.delete(query.path.as_deref()).await?))
}
