use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{Request, Response, StatusCode};
use opentelemetry::KeyValue;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{MakeSpan, OnResponse, TraceLayer},
};
use tracing::Span;

use clue_discovery::{
    AppState, Config,
    llm::{self, anthropic::AnthropicProvider},
    proxy::{ProxySettings, ProxyState},
    questionnaire::Catalog,
    report::{
        GenerationTimeouts, HttpPromptSource, ProxyCompletionClient, ReportOrchestrator, Session,
    },
    routes::create_router,
    telemetry::{HTTP_REQUEST_DURATION, HTTP_REQUESTS_TOTAL, init_telemetry},
};

#[derive(Clone)]
struct HttpMakeSpan;

impl<B> MakeSpan<B> for HttpMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let method = request.method().as_str();
        let path = request.uri().path();

        tracing::info_span!(
            "HTTP request",
            otel.name = %format!("{} {}", method, path),
            http.method = %method,
            http.route = %path,
            http.target = %request.uri(),
            http.flavor = ?request.version(),
            http.request_id = request.headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or(""),
            http.user_agent = request.headers()
                .get("user-agent")
                .and_then(|v| v.to_str().ok())
                .unwrap_or(""),
            http.response.status_code = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
        )
    }
}

#[derive(Clone)]
struct HttpOnResponse;

impl<B> OnResponse<B> for HttpOnResponse {
    fn on_response(self, response: &Response<B>, latency: Duration, span: &Span) {
        let status = response.status().as_u16();

        span.record("http.response.status_code", status as i64);

        if status >= 500 {
            span.record("otel.status_code", "ERROR");
        } else {
            span.record("otel.status_code", "OK");
        }

        let latency_ms = latency.as_secs_f64() * 1000.0;
        let attrs = [
            KeyValue::new("http.status_code", status.to_string()),
            KeyValue::new("http.status_class", format!("{}xx", status / 100)),
        ];

        HTTP_REQUESTS_TOTAL.add(1, &attrs);
        HTTP_REQUEST_DURATION.record(latency_ms, &attrs);

        tracing::info!(
            http.response.status_code = status,
            latency_ms = latency_ms,
            "finished processing request"
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let telemetry_guard = init_telemetry(&config)?;

    tracing::info!(
        port = config.port,
        environment = %config.environment,
        "Starting clue-discovery"
    );

    let llm_client = match config.anthropic_api_key.as_deref() {
        Some(api_key) => {
            let provider: Arc<dyn llm::Provider> =
                Arc::new(AnthropicProvider::new(api_key, &config.anthropic_base_url));
            Some(Arc::new(llm::LlmClient::new(
                provider,
                &config.anthropic_base_url,
            )))
        }
        None => {
            tracing::warn!("ANTHROPIC_API_KEY is not set, the completion proxy will answer 500");
            None
        }
    };

    tracing::info!(
        model = %config.anthropic_model,
        max_output_tokens = config.max_output_tokens,
        generation_timeout_ms = config.generation_timeout.as_millis() as u64,
        prompt_template_url = %config.prompt_template_url,
        completion_proxy_url = %config.completion_proxy_url,
        "Report generation configured"
    );

    let catalog = Arc::new(Catalog::clue());
    let orchestrator = Arc::new(ReportOrchestrator::new(
        Arc::new(HttpPromptSource::new(&config.prompt_template_url)),
        Arc::new(ProxyCompletionClient::new(&config.completion_proxy_url)),
        GenerationTimeouts {
            prompt_fetch: config.prompt_fetch_timeout,
            completion: config.completion_timeout(),
        },
    ));

    let state = AppState {
        catalog: catalog.clone(),
        session: Session::shared(catalog),
        orchestrator,
        proxy: ProxyState {
            llm_client,
            settings: ProxySettings {
                model: config.anthropic_model.clone(),
                max_output_tokens: config.max_output_tokens,
                timeout: config.generation_timeout,
            },
        },
    };

    // Outer bound: the report route waits on the proxy route, so leave room
    // for both timeouts.
    let request_timeout = config.prompt_fetch_timeout + config.completion_timeout() * 2;

    let app = create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(HttpMakeSpan)
                .on_response(HttpOnResponse),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(%addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    telemetry_guard.shutdown();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
