use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_PROMPT_TEMPLATE_URL: &str =
    "https://raw.githubusercontent.com/AlexTMDA/clue-prompts/main/clue-review-prompt.txt";

/// Extra time the client gives the proxy beyond the upstream timeout, so the
/// proxy's own 408 arrives before the client gives up.
pub const CLIENT_TIMEOUT_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub anthropic_base_url: String,
    pub max_output_tokens: u32,
    pub generation_timeout: Duration,
    pub prompt_template_url: String,
    pub prompt_fetch_timeout: Duration,
    pub completion_proxy_url: String,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let port: u16 = parse_var("APP_PORT", 8080)?;

        Ok(Self {
            port,
            environment: env::var("APP_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY")
                .ok()
                .filter(|key| !key.is_empty()),
            anthropic_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-opus-4-20250514".to_string()),
            anthropic_base_url: env::var("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| crate::llm::anthropic::DEFAULT_BASE_URL.to_string()),
            max_output_tokens: parse_var("MAX_OUTPUT_TOKENS", 1500)?,
            generation_timeout: Duration::from_millis(parse_var("GENERATION_TIMEOUT_MS", 25_000)?),
            prompt_template_url: env::var("PROMPT_TEMPLATE_URL")
                .unwrap_or_else(|_| DEFAULT_PROMPT_TEMPLATE_URL.to_string()),
            prompt_fetch_timeout: Duration::from_millis(parse_var(
                "PROMPT_FETCH_TIMEOUT_MS",
                10_000,
            )?),
            completion_proxy_url: env::var("COMPLETION_PROXY_URL").unwrap_or_else(|_| {
                format!("http://127.0.0.1:{port}/api/generate-clue-report")
            }),
            otel_service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "clue-discovery".to_string()),
            otel_exporter_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Client-side bound on the completion call.
    pub fn completion_timeout(&self) -> Duration {
        self.generation_timeout + CLIENT_TIMEOUT_GRACE
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} must be a number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}
