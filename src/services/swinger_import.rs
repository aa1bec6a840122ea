use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::database::models::NewSwinger;
use crate::database::{DatabaseError, SwingerRepository};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("apiUrl is required")]
    MissingUrl,

    #[error("failed to fetch member data: {0}")]
    Fetch(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImportSummary {
    pub message: &'static str,
    pub fetched: usize,
    pub saved: usize,
}

/// `USERID` as the string key it is stored under
fn user_id(json_data: &Value) -> Option<String> {
    match json_data.get("USERID")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `item.member.json_data` of each item, keeping the first occurrence of every `USERID`
pub fn unique_members(items: &[Value]) -> Vec<NewSwinger> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| item.pointer("/member/json_data"))
        .filter_map(|json_data| {
            let id = user_id(json_data)?;
            if !seen.insert(id.clone()) {
                return None;
            }
            let text = |key: &str| {
                json_data
                    .get(key)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            Some(NewSwinger {
                email: text("EMAIL"),
                name: text("NAME"),
                swinger_id: id,
                json_data: Some(json_data.clone()),
            })
        })
        .collect()
}

/// Pulls member records from a remote JSON feed into the swingers table
pub struct SwingerImporter {
    http: reqwest::Client,
    repo: Arc<dyn SwingerRepository>,
}

impl SwingerImporter {
    pub fn new(http: reqwest::Client, repo: Arc<dyn SwingerRepository>) -> Self {
        Self { http, repo }
    }

    pub async fn import(&self, api_url: &str) -> Result<ImportSummary, ImportError> {
        let api_url = api_url.trim();
        if api_url.is_empty() {
            return Err(ImportError::MissingUrl);
        }

        let response = self
            .http
            .get(api_url)
            .send()
            .await
            .map_err(|e| ImportError::Fetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ImportError::Fetch(format!("HTTP error! Status: {}", response.status())));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| ImportError::InvalidFormat(e.to_string()))?;

        self.save(&body).await
    }

    pub async fn save(&self, body: &Value) -> Result<ImportSummary, ImportError> {
        let items = body
            .as_array()
            .ok_or_else(|| ImportError::InvalidFormat("Expected an array".to_string()))?;

        let members = unique_members(items);
        if members.is_empty() {
            warn!("Member feed contained {} items but no usable json_data", items.len());
        }

        let mut saved = 0;
        for member in members {
            self.repo.upsert(member).await?;
            saved += 1;
        }

        info!("Imported {} swingers from {} items", saved, items.len());
        Ok(ImportSummary {
            message: "Data successfully saved to the database",
            fetched: items.len(),
            saved,
        })
    }
}
