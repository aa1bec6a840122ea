use axum::{extract::State, Json};
use serde::Deserialize;

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::swinger_import::ImportSummary;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchDataRequest {
    #[serde(default)]
    pub api_url: String,
}

/// POST /swingers/fetch-data - Import members from a remote JSON array
pub async fn fetch_data_post(
    State(state): State<AppState>,
    Json(body): Json<FetchDataRequest>,
) -> ApiResult<ImportSummary> {
    Ok(ApiResponse::success(state.importer.import(&body.api_url).await?))
}
