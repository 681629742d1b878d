use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::{GenerateRequest, GenerateResponse, LlmError, Provider};
use crate::telemetry::metrics::{
    GEN_AI_ERROR_COUNT, GEN_AI_OPERATION_DURATION, GEN_AI_TOKEN_USAGE,
};

/// Wraps a provider with gen_ai spans and metrics. One call, no retries.
pub struct LlmClient {
    pub provider: Arc<dyn Provider>,
    pub server_address: String,
    pub server_port: u16,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn Provider>, base_url: &str) -> Self {
        let (server_address, server_port) = reqwest::Url::parse(base_url)
            .ok()
            .map(|url| {
                (
                    url.host_str().unwrap_or("unknown").to_string(),
                    url.port_or_known_default().unwrap_or(443),
                )
            })
            .unwrap_or_else(|| ("unknown".to_string(), 443));

        Self {
            provider,
            server_address,
            server_port,
        }
    }

    pub async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let provider_name = self.provider.name().to_string();
        let span_display_name = format!("gen_ai.chat {}", req.model);
        let start = Instant::now();

        let span = tracing::info_span!(
            "gen_ai.chat",
            otel.name = %span_display_name,
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = %provider_name,
            gen_ai.request.model = %req.model,
            server.address = %self.server_address,
            server.port = self.server_port,
            gen_ai.request.max_tokens = req.max_tokens as i64,
            gen_ai.response.model = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );

        span.add_event(
            "gen_ai.user.message",
            vec![KeyValue::new("gen_ai.prompt", truncate(&req.prompt, 1000))],
        );

        let result = self.provider.generate(req).instrument(span.clone()).await;

        let duration = start.elapsed().as_secs_f64();
        let op_kv = KeyValue::new("gen_ai.operation.name", "chat");
        let provider_kv = KeyValue::new("gen_ai.provider.name", provider_name);
        let model_kv = KeyValue::new("gen_ai.request.model", req.model.clone());

        match result {
            Ok(resp) => {
                span.record("gen_ai.response.model", resp.model.as_str());
                span.record("gen_ai.usage.input_tokens", resp.input_tokens as i64);
                span.record("gen_ai.usage.output_tokens", resp.output_tokens as i64);
                if !resp.finish_reason.is_empty() {
                    span.record(
                        "gen_ai.response.finish_reasons",
                        resp.finish_reason.as_str(),
                    );
                }

                span.add_event(
                    "gen_ai.assistant.message",
                    vec![KeyValue::new(
                        "gen_ai.completion",
                        truncate(&resp.content, 2000),
                    )],
                );

                for (token_type, count) in [("input", resp.input_tokens), ("output", resp.output_tokens)] {
                    GEN_AI_TOKEN_USAGE.record(
                        f64::from(count),
                        &[
                            KeyValue::new("gen_ai.token.type", token_type),
                            op_kv.clone(),
                            provider_kv.clone(),
                            model_kv.clone(),
                        ],
                    );
                }
                GEN_AI_OPERATION_DURATION.record(duration, &[op_kv, provider_kv, model_kv]);

                Ok(resp)
            }
            Err(err) => {
                let error_type = classify_error(&err);
                span.record("otel.status_code", "ERROR");
                span.record("error.type", error_type);

                GEN_AI_ERROR_COUNT.add(
                    1,
                    &[
                        provider_kv,
                        model_kv,
                        KeyValue::new("error.type", error_type),
                    ],
                );

                Err(err)
            }
        }
    }
}

fn classify_error(err: &LlmError) -> &'static str {
    match err {
        LlmError::Upstream { status, .. } => match status {
            429 => "rate_limit",
            408 | 504 => "timeout",
            401 | 403 => "auth_error",
            400 | 404 | 413 | 422 => "invalid_request",
            500..=599 => "server_error",
            _ => "unknown_error",
        },
        LlmError::Transport(e) if e.is_timeout() => "timeout",
        LlmError::Transport(_) => "network_error",
        LlmError::Decode(_) => "invalid_response",
        LlmError::InvalidHeader(_) => "auth_error",
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.char_indices()
            .take_while(|&(i, c)| i + c.len_utf8() <= max)
            .map(|(_, c)| c)
            .collect()
    }
}
