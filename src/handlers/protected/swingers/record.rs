use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::database::models::{NewSwinger, Swinger, SwingerKey, SwingerPatch, SwingerSummary};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SwingerCount {
    pub count: i64,
}

/// GET /swingers/count - Total number of stored members
pub async fn count(State(state): State<AppState>) -> ApiResult<SwingerCount> {
    let count = state.swingers.count().await?;
    Ok(ApiResponse::success(SwingerCount { count }))
}

/// POST /swingers - Insert a member; an existing swingerID is a conflict
pub async fn create(State(state): State<AppState>, Json(body): Json<NewSwinger>) -> ApiResult<Swinger> {
    if body.swinger_id.trim().is_empty() {
        return Err(ApiError::bad_request("swingerID is required"));
    }
    let created = state.swingers.create(body).await?;
    info!("Created swinger {}", created.swinger_id);
    Ok(ApiResponse::created(created))
}

/// PUT /swingers/:swingerID - Update only the fields present in the body
pub async fn update(
    State(state): State<AppState>,
    Path(swinger_id): Path<String>,
    Json(patch): Json<SwingerPatch>,
) -> ApiResult<Swinger> {
    let updated = state
        .swingers
        .update(&SwingerKey::SwingerId(swinger_id), patch)
        .await?;
    Ok(ApiResponse::success(updated))
}

/// GET /swingers - Summaries, optionally limited
pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Vec<SwingerSummary>> {
    let limit = query.limit.filter(|l| *l > 0);
    let rows = state.swingers.list(limit).await?;
    Ok(ApiResponse::success(rows.into_iter().map(SwingerSummary::from).collect()))
}

/// GET /swingers/:swingerID - Full record including json_data
pub async fn show(State(state): State<AppState>, Path(swinger_id): Path<String>) -> ApiResult<Swinger> {
    let key = SwingerKey::SwingerId(swinger_id);
    let swinger = state
        .swingers
        .find(&key)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Swinger with {} not found", key)))?;
    Ok(ApiResponse::success(swinger))
}
