use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::AiError;
use crate::config::AiConfig;

pub const NO_RESPONSE: &str = "No response from ChatGPT";

#[async_trait]
pub trait ChatGpt: Send + Sync {
    async fn ask(&self, question: &str) -> Result<String, AiError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Delay before retry `attempt` (1-based): `base * 2^attempt`
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// OpenAI chat completions client with 429 backoff
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
    max_retries: u32,
    retry_base: Duration,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, config: &AiConfig) -> Self {
        Self {
            http,
            api_key: config.openai_api_key.clone(),
            api_url: config.openai_api_url.clone(),
            model: config.openai_model.clone(),
            max_retries: config.openai_max_retries,
            retry_base: Duration::from_millis(config.openai_retry_base_ms),
        }
    }
}

#[async_trait]
impl ChatGpt for OpenAiClient {
    async fn ask(&self, question: &str) -> Result<String, AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::NotConfigured("ChatGPT"));
        }
        if question.trim().is_empty() {
            return Err(AiError::EmptyInput);
        }

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: question,
            }],
        };

        let mut attempt = 1;
        loop {
            let response = self
                .http
                .post(&self.api_url)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt > self.max_retries {
                    error!("ChatGPT still rate limited after {} attempts", attempt);
                    return Err(AiError::RateLimited { attempts: attempt });
                }
                let delay = backoff_delay(self.retry_base, attempt);
                warn!("Rate limit hit. Retrying in {:?}", delay);
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AiError::Upstream {
                    status: status.as_u16(),
                    body,
                });
            }

            let body: ChatResponse = response.json().await?;
            return Ok(body
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message)
                .and_then(|m| m.content)
                .unwrap_or_else(|| NO_RESPONSE.to_string()));
        }
    }
}
