//! Completion proxy: holds the upstream credential and forwards
//! prompt + transcript to the LLM as a single user message.
//!
//! Wire contract: `POST {prompt, transcript}` answers `200 {report, timing}`
//! or a non-2xx `{error, details?}`. `OPTIONS` answers 204. Every response
//! carries permissive CORS headers and `Content-Type: application/json`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Json, Router,
    extract::{FromRef, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::llm::{GenerateRequest, LlmClient, LlmError};

pub const ROUTE: &str = "/api/generate-clue-report";
pub const NO_CONTENT_FALLBACK: &str = "No content received";

#[derive(Debug, Clone)]
pub struct ProxySettings {
    pub model: String,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct ProxyState {
    /// `None` when no API key is configured.
    pub llm_client: Option<Arc<LlmClient>>,
    pub settings: ProxySettings,
}

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub prompt: Option<String>,
    pub transcript: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub total_duration: u64,
    pub api_call_duration: u64,
    pub total_seconds: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateReply {
    pub report: String,
    pub timing: Timing,
}

/// Non-2xx proxy answer.
#[derive(Debug)]
pub struct ProxyFailure {
    pub status: StatusCode,
    pub error: &'static str,
    pub details: Option<String>,
}

impl ProxyFailure {
    fn new(status: StatusCode, error: &'static str) -> Self {
        Self {
            status,
            error,
            details: None,
        }
    }

    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl IntoResponse for ProxyFailure {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => serde_json::json!({ "error": self.error, "details": details }),
            None => serde_json::json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<LlmError> for ProxyFailure {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Upstream { status, body } => ProxyFailure::new(
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                "API request failed",
            )
            .with_details(body),
            other => ProxyFailure::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                .with_details(other.to_string()),
        }
    }
}

/// The text the model receives.
pub fn compose_model_input(prompt: &str, transcript: &str) -> String {
    format!("{prompt}\n\nDiscovery Call Transcript:\n{transcript}")
}

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ProxyState: FromRef<S>,
{
    Router::new()
        .route(
            ROUTE,
            post(generate_clue_report)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("Content-Type, Authorization"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("POST, OPTIONS"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        ))
}

async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn method_not_allowed() -> ProxyFailure {
    ProxyFailure::new(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

#[tracing::instrument(
    name = "proxy generate-clue-report",
    skip_all,
    fields(
        prompt.length,
        transcript.length,
        gen_ai.request.max_tokens,
        report.length,
        proxy.api_call_ms,
    )
)]
pub async fn generate_clue_report(
    State(state): State<ProxyState>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> Result<Json<GenerateReply>, ProxyFailure> {
    let start = Instant::now();
    let span = tracing::Span::current();

    let Some(llm_client) = state.llm_client.as_ref() else {
        tracing::error!("Missing API key");
        return Err(ProxyFailure::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "API key not configured",
        ));
    };

    let Json(body) = body.map_err(|rejection| {
        ProxyFailure::new(StatusCode::BAD_REQUEST, "Invalid request body")
            .with_details(rejection.body_text())
    })?;

    let (prompt, transcript) = match (body.prompt, body.transcript) {
        (Some(p), Some(t)) if !p.is_empty() && !t.is_empty() => (p, t),
        (p, t) => {
            tracing::info!(
                has_prompt = p.is_some_and(|p| !p.is_empty()),
                has_transcript = t.is_some_and(|t| !t.is_empty()),
                "Missing data"
            );
            return Err(ProxyFailure::new(
                StatusCode::BAD_REQUEST,
                "Missing prompt or transcript",
            ));
        }
    };

    span.record("prompt.length", prompt.len());
    span.record("transcript.length", transcript.len());
    span.record(
        "gen_ai.request.max_tokens",
        state.settings.max_output_tokens as i64,
    );

    let request = GenerateRequest {
        model: state.settings.model.clone(),
        prompt: compose_model_input(&prompt, &transcript),
        max_tokens: state.settings.max_output_tokens,
    };

    let api_call_start = Instant::now();
    let result = tokio::time::timeout(state.settings.timeout, llm_client.generate(&request)).await;
    let api_call_duration = api_call_start.elapsed();
    span.record("proxy.api_call_ms", api_call_duration.as_millis() as i64);

    let response = match result {
        Err(_) => {
            tracing::warn!(
                timeout_ms = state.settings.timeout.as_millis() as u64,
                "Upstream call timed out"
            );
            return Err(ProxyFailure::new(StatusCode::REQUEST_TIMEOUT, "Request timeout")
                .with_details(
                    "Report generation took too long. Try with fewer questions or simpler responses.",
                ));
        }
        Ok(Err(err)) => {
            tracing::error!(error = %err, "Upstream call failed");
            return Err(err.into());
        }
        Ok(Ok(response)) => response,
    };

    let report = if response.content.is_empty() {
        NO_CONTENT_FALLBACK.to_string()
    } else {
        response.content
    };

    let total_duration = start.elapsed();
    span.record("report.length", report.len());
    tracing::info!(
        report_length = report.len(),
        total_ms = total_duration.as_millis() as u64,
        "Report generated"
    );

    Ok(Json(GenerateReply {
        report,
        timing: Timing {
            total_duration: total_duration.as_millis() as u64,
            api_call_duration: api_call_duration.as_millis() as u64,
            total_seconds: format!("{:.2}", total_duration.as_secs_f64()),
        },
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    use super::*;
    use crate::llm::{GenerateResponse, Provider};

    enum Behaviour {
        Reply(&'static str),
        Fail(u16, &'static str),
        Hang,
    }

    struct StubProvider {
        behaviour: Behaviour,
        seen: std::sync::Mutex<Vec<GenerateRequest>>,
    }

    #[async_trait::async_trait]
    impl Provider for StubProvider {
        async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
            self.seen.lock().unwrap().push(req.clone());
            match self.behaviour {
                Behaviour::Reply(text) => Ok(GenerateResponse {
                    content: text.to_string(),
                    model: req.model.clone(),
                    input_tokens: 10,
                    output_tokens: 5,
                    finish_reason: "end_turn".to_string(),
                }),
                Behaviour::Fail(status, body) => Err(LlmError::Upstream {
                    status,
                    body: body.to_string(),
                }),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(LlmError::Decode("unreachable".into()))
                }
            }
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn app(behaviour: Option<Behaviour>) -> (Router, Option<Arc<StubProvider>>) {
        let provider = behaviour.map(|behaviour| {
            Arc::new(StubProvider {
                behaviour,
                seen: std::sync::Mutex::new(Vec::new()),
            })
        });
        let state = ProxyState {
            llm_client: provider
                .clone()
                .map(|p| Arc::new(LlmClient::new(p, "http://127.0.0.1:1"))),
            settings: ProxySettings {
                model: "test-model".to_string(),
                max_output_tokens: 1500,
                timeout: Duration::from_millis(100),
            },
        };
        (router().with_state(state), provider)
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(ROUTE)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn assert_cors(response: &Response) {
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type, Authorization"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST, OPTIONS");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn test_options_preflight() {
        let (app, _) = app(Some(Behaviour::Reply("unused")));
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri(ROUTE)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_cors(&response);
    }

    #[tokio::test]
    async fn test_wrong_method() {
        let (app, _) = app(Some(Behaviour::Reply("unused")));
        let response = app
            .oneshot(Request::builder().uri(ROUTE).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_cors(&response);
        assert_eq!(json_body(response).await["error"], "Method Not Allowed");
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let (app, _) = app(None);
        let response = app
            .oneshot(post_json(r#"{"prompt": "P", "transcript": "T"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "API key not configured");
    }

    #[tokio::test]
    async fn test_missing_fields() {
        for body in [
            r#"{"prompt": "P"}"#,
            r#"{"transcript": "T"}"#,
            r#"{"prompt": "", "transcript": "T"}"#,
        ] {
            let (app, provider) = app(Some(Behaviour::Reply("unused")));
            let response = app.oneshot(post_json(body)).await.unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {body}");
            assert_eq!(
                json_body(response).await["error"],
                "Missing prompt or transcript"
            );
            assert!(provider.unwrap().seen.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_invalid_json() {
        let (app, _) = app(Some(Behaviour::Reply("unused")));
        let response = app.oneshot(post_json("{not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Invalid request body");
    }

    #[tokio::test]
    async fn test_success_composes_model_input() {
        let (app, provider) = app(Some(Behaviour::Reply("THE REPORT")));
        let response = app
            .oneshot(post_json(r#"{"prompt": "TEMPLATE", "transcript": "Q: a\nA: b"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_cors(&response);
        let json = json_body(response).await;
        assert_eq!(json["report"], "THE REPORT");
        assert!(json["timing"]["totalDuration"].is_u64());
        assert!(json["timing"]["totalSeconds"].is_string());

        let seen = provider.unwrap().seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].prompt,
            "TEMPLATE\n\nDiscovery Call Transcript:\nQ: a\nA: b"
        );
        assert_eq!(seen[0].max_tokens, 1500);
        assert_eq!(seen[0].model, "test-model");
    }

    #[tokio::test]
    async fn test_empty_upstream_content_uses_fallback_text() {
        let (app, _) = app(Some(Behaviour::Reply("")));
        let response = app
            .oneshot(post_json(r#"{"prompt": "P", "transcript": "T"}"#))
            .await
            .unwrap();

        assert_eq!(json_body(response).await["report"], NO_CONTENT_FALLBACK);
    }

    #[tokio::test]
    async fn test_upstream_status_is_forwarded() {
        let (app, _) = app(Some(Behaviour::Fail(429, "slow down")));
        let response = app
            .oneshot(post_json(r#"{"prompt": "P", "transcript": "T"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let json = json_body(response).await;
        assert_eq!(json["error"], "API request failed");
        assert_eq!(json["details"], "slow down");
    }

    #[tokio::test]
    async fn test_upstream_timeout() {
        let (app, _) = app(Some(Behaviour::Hang));
        let response = app
            .oneshot(post_json(r#"{"prompt": "P", "transcript": "T"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_cors(&response);
        assert_eq!(json_body(response).await["error"], "Request timeout");
    }

    #[test]
    fn test_compose_model_input() {
        assert_eq!(
            compose_model_input("P", "T"),
            "P\n\nDiscovery Call Transcript:\nT"
        );
    }
}
