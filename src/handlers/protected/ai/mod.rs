// handlers/protected/ai/mod.rs - ChatGPT and Gemini proxies

pub mod chatgpt;
pub mod gemini;
