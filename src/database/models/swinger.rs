use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Swinger {
    pub id: Uuid,
    #[serde(rename = "swingerID")]
    pub swinger_id: String,
    pub email: String,
    pub name: String,
    pub json_data: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List projection
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SwingerSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(rename = "swingerID")]
    pub swinger_id: String,
}

impl From<Swinger> for SwingerSummary {
    fn from(s: Swinger) -> Self {
        Self {
            id: s.id,
            name: s.name,
            email: s.email,
            swinger_id: s.swinger_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewSwinger {
    pub email: String,
    pub name: String,
    #[serde(rename = "swingerID")]
    pub swinger_id: String,
    #[serde(default)]
    pub json_data: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SwingerPatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub json_data: Option<Value>,
}

/// Either the row id or the external member id
#[derive(Debug, Clone, PartialEq)]
pub enum SwingerKey {
    Id(Uuid),
    SwingerId(String),
}

impl std::fmt::Display for SwingerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwingerKey::Id(id) => write!(f, "id {}", id),
            SwingerKey::SwingerId(id) => write!(f, "swingerID {}", id),
        }
    }
}
