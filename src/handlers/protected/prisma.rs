// handlers/protected/prisma.rs - POST /api/prisma generic model dispatch
//
// Request: { "model": "swinger"|"user", "operation": "...", "data": {...} }
// Operations: findMany {limit?}, findUnique {where}, count, create {<record>},
// update {where, data}, delete {where}

use std::str::FromStr;

use axum::{extract::State, Json};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::database::models::{NewSwinger, NewUser, SwingerKey, SwingerPatch, SwingerSummary, UserPatch};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PrismaRequest {
    pub model: String,
    pub operation: String,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    Swinger,
    User,
}

impl FromStr for Model {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "swinger" | "swingers" => Ok(Model::Swinger),
            "user" | "users" => Ok(Model::User),
            _ => Err(ApiError::bad_request(format!("Unknown model: {}", s))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    FindMany,
    FindUnique,
    Count,
    Create,
    Update,
    Delete,
}

impl FromStr for Operation {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "findMany" => Ok(Operation::FindMany),
            "findUnique" => Ok(Operation::FindUnique),
            "count" => Ok(Operation::Count),
            "create" => Ok(Operation::Create),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            _ => Err(ApiError::bad_request(format!("Unknown operation: {}", s))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FindManyArgs {
    limit: Option<i64>,
}

impl FindManyArgs {
    /// Zero or negative means no limit
    fn limit(&self) -> Option<i64> {
        self.limit.filter(|l| *l > 0)
    }
}

#[derive(Debug, Default, Deserialize)]
struct WhereClause {
    id: Option<Uuid>,
    #[serde(rename = "swingerID")]
    swinger_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhereArgs {
    #[serde(rename = "where", default)]
    filter: WhereClause,
}

#[derive(Debug, Deserialize)]
struct UpdateArgs<T> {
    #[serde(rename = "where", default)]
    filter: WhereClause,
    data: T,
}

impl WhereClause {
    fn swinger_key(self) -> Result<SwingerKey, ApiError> {
        match (self.id, self.swinger_id) {
            (Some(id), _) => Ok(SwingerKey::Id(id)),
            (None, Some(swinger_id)) => Ok(SwingerKey::SwingerId(swinger_id)),
            (None, None) => Err(ApiError::bad_request("where.id or where.swingerID is required")),
        }
    }

    fn user_id(self) -> Result<Uuid, ApiError> {
        self.id.ok_or_else(|| ApiError::bad_request("where.id is required"))
    }
}

fn args<T: DeserializeOwned>(data: Value) -> Result<T, ApiError> {
    let data = if data.is_null() { json!({}) } else { data };
    serde_json::from_value(data).map_err(|e| ApiError::bad_request(format!("Invalid data: {}", e)))
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::internal_server_error(e.to_string()))
}

/// POST /api/prisma - Run one operation against the swinger or user table
pub async fn prisma_post(State(state): State<AppState>, Json(request): Json<PrismaRequest>) -> ApiResult<Value> {
    let model: Model = request.model.parse()?;
    let operation: Operation = request.operation.parse()?;
    debug!("prisma {:?}.{:?}", model, operation);

    let result = match model {
        Model::Swinger => swinger(&state, operation, request.data).await?,
        Model::User => user(&state, operation, request.data).await?,
    };
    Ok(ApiResponse::success(result))
}

async fn swinger(state: &AppState, operation: Operation, data: Value) -> Result<Value, ApiError> {
    let repo = &state.swingers;
    match operation {
        Operation::FindMany => {
            let find: FindManyArgs = args(data)?;
            let rows = repo.list(find.limit()).await?;
            to_value(rows.into_iter().map(SwingerSummary::from).collect::<Vec<_>>())
        }
        Operation::FindUnique => {
            let WhereArgs { filter } = args(data)?;
            let key = filter.swinger_key()?;
            let found = repo
                .find(&key)
                .await?
                .ok_or_else(|| ApiError::not_found(format!("Swinger with {} not found", key)))?;
            to_value(found)
        }
        Operation::Count => to_value(json!({ "count": repo.count().await? })),
        Operation::Create => to_value(repo.create(args::<NewSwinger>(data)?).await?),
        Operation::Update => {
            let UpdateArgs { filter, data } = args::<UpdateArgs<SwingerPatch>>(data)?;
            to_value(repo.update(&filter.swinger_key()?, data).await?)
        }
        Operation::Delete => {
            let WhereArgs { filter } = args(data)?;
            to_value(repo.delete(&filter.swinger_key()?).await?)
        }
    }
}

async fn user(state: &AppState, operation: Operation, data: Value) -> Result<Value, ApiError> {
    let repo = &state.users;
    match operation {
        Operation::FindMany => {
            let find: FindManyArgs = args(data)?;
            to_value(repo.list(find.limit()).await?)
        }
        Operation::FindUnique => {
            let WhereArgs { filter } = args(data)?;
            let id = filter.user_id()?;
            let found = repo
                .find(id)
                .await?
                .ok_or_else(|| ApiError::not_found(format!("User {} not found", id)))?;
            to_value(found)
        }
        Operation::Count => to_value(json!({ "count": repo.count().await? })),
        Operation::Create => to_value(repo.create(args::<NewUser>(data)?).await?),
        Operation::Update => {
            let UpdateArgs { filter, data } = args::<UpdateArgs<UserPatch>>(data)?;
            to_value(repo.update(filter.user_id()?, data).await?)
        }
        Operation::Delete => {
            let WhereArgs { filter } = args(data)?;
            to_value(repo.delete(filter.user_id()?).await?)
        }
    }
}
