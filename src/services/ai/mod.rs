pub mod chatgpt;
pub mod gemini;

use thiserror::Error;

pub use chatgpt::{ChatGpt, OpenAiClient};
pub use gemini::{Gemini, GeminiClient};

#[derive(Debug, Error)]
pub enum AiError {
    #[error("{0}")]
    NotConfigured(&'static str),

    #[error("input text is required")]
    EmptyInput,

    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
