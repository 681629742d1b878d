use std::time::Instant;

use crate::telemetry::metrics::PROMPT_FETCH_DURATION;

use super::error::GenerationError;

/// Supplies the prompt template prepended to every transcript.
#[async_trait::async_trait]
pub trait PromptSource: Send + Sync {
    async fn fetch(&self) -> Result<String, GenerationError>;
}

/// Fetches the template with a single GET; the body is used verbatim.
pub struct HttpPromptSource {
    client: reqwest::Client,
    url: String,
}

impl HttpPromptSource {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl PromptSource for HttpPromptSource {
    #[tracing::instrument(
        name = "prompt fetch",
        skip(self),
        fields(prompt.url = %self.url, prompt.length, http.response.status_code)
    )]
    async fn fetch(&self) -> Result<String, GenerationError> {
        let start = Instant::now();

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| GenerationError::PromptFetch(e.to_string()))?;

        let status = response.status();
        let span = tracing::Span::current();
        span.record("http.response.status_code", status.as_u16() as i64);

        if !status.is_success() {
            return Err(GenerationError::PromptFetch(format!(
                "{} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )));
        }

        let prompt = response
            .text()
            .await
            .map_err(|e| GenerationError::PromptFetch(e.to_string()))?;

        PROMPT_FETCH_DURATION.record(start.elapsed().as_secs_f64(), &[]);
        span.record("prompt.length", prompt.len());
        tracing::info!(length = prompt.len(), "Prompt template fetched");

        Ok(prompt)
    }
}
