pub mod anthropic;
pub mod client;

use thiserror::Error;

pub use client::LlmClient;

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub content: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: String,
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("request to upstream failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid upstream response: {0}")]
    Decode(String),

    #[error("invalid API key header: {0}")]
    InvalidHeader(String),
}

#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, LlmError>;
    fn name(&self) -> &str;
}
