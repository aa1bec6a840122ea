use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::AiError;
use crate::config::AiConfig;

#[async_trait]
pub trait Gemini: Send + Sync {
    /// Forward a `generateContent` request body and return the raw response
    async fn generate_content(&self, request: &Value) -> Result<Value, AiError>;

    async fn answer(&self, question: &str) -> Result<String, AiError> {
        if question.trim().is_empty() {
            return Err(AiError::EmptyInput);
        }
        let response = self.generate_content(&text_request(question)).await?;
        response_text(&response)
            .ok_or_else(|| AiError::InvalidResponse("no candidate text in Gemini response".to_string()))
    }
}

/// `{contents:[{parts:[{text}]}]}` for a single prompt
pub fn text_request(text: &str) -> Value {
    json!({ "contents": [{ "parts": [{ "text": text }] }] })
}

/// First part text of the first content in a request body
pub fn first_prompt(request: &Value) -> Option<&str> {
    request
        .pointer("/contents/0/parts/0/text")
        .and_then(Value::as_str)
}

/// Concatenated text parts of the first candidate
pub fn response_text(response: &Value) -> Option<String> {
    let parts = response.pointer("/candidates/0/content/parts")?.as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, config: &AiConfig) -> Self {
        Self {
            http,
            api_key: config.gemini_api_key.clone(),
            api_url: config.gemini_api_url.clone(),
            model: config.gemini_model.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_url, self.model)
    }
}

#[async_trait]
impl Gemini for GeminiClient {
    async fn generate_content(&self, request: &Value) -> Result<Value, AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::NotConfigured("Gemini"));
        }
        if first_prompt(request).map_or(true, |t| t.trim().is_empty()) {
            return Err(AiError::EmptyInput);
        }

        debug!("Calling Gemini model {}", self.model);
        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}
