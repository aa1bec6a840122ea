//! DynamoDB passthrough and the shell command log.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::types::{
    AttributeDefinition, AttributeValue, BillingMode, KeySchemaElement, KeyType, ProvisionedThroughput,
    ScalarAttributeType,
};
use aws_sdk_dynamodb::Client;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DynamoError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Sdk(String),
}

/// Map an SDK error to DynamoError, keeping caller mistakes as 400s
fn map_sdk_error<E, R>(err: SdkError<E, R>) -> DynamoError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
    match err.code() {
        Some("ResourceNotFoundException") => DynamoError::InvalidRequest(format!("Table not found: {}", message)),
        Some("ResourceInUseException") => DynamoError::InvalidRequest(format!("Table already exists: {}", message)),
        Some("ValidationException") => DynamoError::InvalidRequest(message),
        _ => DynamoError::Sdk(message),
    }
}

/// One entry of the command log table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredCommand {
    pub command_id: String,
    pub command: String,
    pub timestamp: String,
}

impl StoredCommand {
    /// Id is `<timestamp>-<8 hex>` so entries stored in the same millisecond stay distinct
    pub fn now(command: &str) -> Self {
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            command_id: format!("{}-{}", stamp, &suffix[..8]),
            command: command.to_string(),
            timestamp: stamp,
        }
    }

    fn to_item(&self) -> HashMap<String, AttributeValue> {
        HashMap::from([
            ("commandId".to_string(), AttributeValue::S(self.command_id.clone())),
            ("command".to_string(), AttributeValue::S(self.command.clone())),
            ("timestamp".to_string(), AttributeValue::S(self.timestamp.clone())),
        ])
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct KeySchemaEntry {
    #[serde(rename = "AttributeName")]
    pub attribute_name: String,
    #[serde(rename = "KeyType")]
    pub key_type: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AttributeDefinitionEntry {
    #[serde(rename = "AttributeName")]
    pub attribute_name: String,
    #[serde(rename = "AttributeType")]
    pub attribute_type: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct Throughput {
    #[serde(rename = "ReadCapacityUnits")]
    pub read_capacity_units: i64,
    #[serde(rename = "WriteCapacityUnits")]
    pub write_capacity_units: i64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateTableRequest {
    pub table_name: String,
    pub key_schema: Vec<KeySchemaEntry>,
    pub attribute_definitions: Vec<AttributeDefinitionEntry>,
    #[serde(default)]
    pub provisioned_throughput: Option<Throughput>,
}

impl CreateTableRequest {
    pub fn validate(&self) -> Result<(), DynamoError> {
        if self.table_name.trim().is_empty() {
            return Err(DynamoError::InvalidRequest("tableName is required".to_string()));
        }
        if self.key_schema.is_empty() {
            return Err(DynamoError::InvalidRequest("keySchema must not be empty".to_string()));
        }
        if let Some(bad) = self.key_schema.iter().find(|k| !matches!(k.key_type.as_str(), "HASH" | "RANGE")) {
            return Err(DynamoError::InvalidRequest(format!("Unsupported KeyType {}", bad.key_type)));
        }
        if let Some(bad) = self
            .attribute_definitions
            .iter()
            .find(|a| !matches!(a.attribute_type.as_str(), "S" | "N" | "B"))
        {
            return Err(DynamoError::InvalidRequest(format!(
                "Unsupported AttributeType {}",
                bad.attribute_type
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreatedTable {
    pub table_name: String,
    pub table_status: Option<String>,
}

/// Convert a DynamoDB attribute to plain JSON
pub fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => number_to_json(n),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::M(map) => item_to_json(map),
        AttributeValue::L(list) => Value::Array(list.iter().map(attribute_to_json).collect()),
        AttributeValue::Ss(set) => Value::Array(set.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(set) => Value::Array(set.iter().map(|n| number_to_json(n)).collect()),
        AttributeValue::B(blob) => Value::String(STANDARD.encode(blob.as_ref())),
        AttributeValue::Bs(blobs) => Value::Array(
            blobs
                .iter()
                .map(|b| Value::String(STANDARD.encode(b.as_ref())))
                .collect(),
        ),
        _ => Value::Null,
    }
}

pub fn item_to_json(item: &HashMap<String, AttributeValue>) -> Value {
    let map: Map<String, Value> = item
        .iter()
        .map(|(k, v)| (k.clone(), attribute_to_json(v)))
        .collect();
    Value::Object(map)
}

fn number_to_json(n: &str) -> Value {
    if let Ok(i) = n.parse::<i64>() {
        return Value::Number(i.into());
    }
    n.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(n.to_string()))
}

/// Decode log items, skipping rows that don't look like commands, oldest first
pub fn commands_from_items(items: &[HashMap<String, AttributeValue>]) -> Vec<StoredCommand> {
    let mut commands: Vec<StoredCommand> = items
        .iter()
        .filter_map(|item| match serde_json::from_value(item_to_json(item)) {
            Ok(command) => Some(command),
            Err(e) => {
                warn!("Skipping malformed command log item: {}", e);
                None
            }
        })
        .collect();
    commands.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    commands
}

/// DynamoDB operations the API exposes
#[async_trait]
pub trait DynamoStore: Send + Sync {
    async fn store_command(&self, command: &str) -> Result<StoredCommand, DynamoError>;
    async fn stored_commands(&self) -> Result<Vec<StoredCommand>, DynamoError>;
    async fn list_tables(&self) -> Result<Vec<String>, DynamoError>;
    async fn scan_table(&self, table_name: &str) -> Result<Vec<Value>, DynamoError>;
    async fn create_table(&self, request: CreateTableRequest) -> Result<CreatedTable, DynamoError>;
}

pub struct DynamoService {
    client: Client,
    command_table: String,
}

impl DynamoService {
    pub fn new(client: Client, command_table: impl Into<String>) -> Self {
        Self {
            client,
            command_table: command_table.into(),
        }
    }

    async fn scan_all(&self, table_name: &str) -> Result<Vec<HashMap<String, AttributeValue>>, DynamoError> {
        let mut items = Vec::new();
        let mut start_key = None;
        loop {
            let output = self
                .client
                .scan()
                .table_name(table_name)
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(map_sdk_error)?;
            items.extend(output.items().iter().cloned());

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }
        Ok(items)
    }
}

fn build_error(e: impl std::fmt::Display) -> DynamoError {
    DynamoError::InvalidRequest(e.to_string())
}

#[async_trait]
impl DynamoStore for DynamoService {
    async fn store_command(&self, command: &str) -> Result<StoredCommand, DynamoError> {
        let entry = StoredCommand::now(command);
        self.client
            .put_item()
            .table_name(&self.command_table)
            .set_item(Some(entry.to_item()))
            .send()
            .await
            .map_err(map_sdk_error)?;
        Ok(entry)
    }

    async fn stored_commands(&self) -> Result<Vec<StoredCommand>, DynamoError> {
        let items = self.scan_all(&self.command_table).await?;
        Ok(commands_from_items(&items))
    }

    async fn list_tables(&self) -> Result<Vec<String>, DynamoError> {
        let mut names = Vec::new();
        let mut start = None;
        loop {
            let output = self
                .client
                .list_tables()
                .set_exclusive_start_table_name(start)
                .send()
                .await
                .map_err(map_sdk_error)?;
            names.extend(output.table_names().iter().cloned());

            match output.last_evaluated_table_name() {
                Some(last) => start = Some(last.to_string()),
                None => break,
            }
        }
        Ok(names)
    }

    async fn scan_table(&self, table_name: &str) -> Result<Vec<Value>, DynamoError> {
        let items = self.scan_all(table_name).await?;
        Ok(items.iter().map(item_to_json).collect())
    }

    async fn create_table(&self, request: CreateTableRequest) -> Result<CreatedTable, DynamoError> {
        request.validate()?;

        let key_schema = request
            .key_schema
            .iter()
            .map(|k| {
                KeySchemaElement::builder()
                    .attribute_name(&k.attribute_name)
                    .key_type(KeyType::from(k.key_type.as_str()))
                    .build()
                    .map_err(build_error)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let definitions = request
            .attribute_definitions
            .iter()
            .map(|a| {
                AttributeDefinition::builder()
                    .attribute_name(&a.attribute_name)
                    .attribute_type(ScalarAttributeType::from(a.attribute_type.as_str()))
                    .build()
                    .map_err(build_error)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = self
            .client
            .create_table()
            .table_name(&request.table_name)
            .set_key_schema(Some(key_schema))
            .set_attribute_definitions(Some(definitions));
        builder = match request.provisioned_throughput {
            Some(t) => builder.provisioned_throughput(
                ProvisionedThroughput::builder()
                    .read_capacity_units(t.read_capacity_units)
                    .write_capacity_units(t.write_capacity_units)
                    .build()
                    .map_err(build_error)?,
            ),
            None => builder.billing_mode(BillingMode::PayPerRequest),
        };

        let output = builder.send().await.map_err(map_sdk_error)?;
        info!("Created DynamoDB table {}", request.table_name);

        Ok(CreatedTable {
            table_name: request.table_name,
            table_status: output
                .table_description()
                .and_then(|d| d.table_status())
                .map(|s| s.as_str().to_string()),
        })
    }
}
