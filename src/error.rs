use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use opentelemetry::trace::TraceContextExt;
use serde_json::json;
use thiserror::Error;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::report::{GenerationError, SessionError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Session(SessionError::UnknownQuestion(_)) => StatusCode::NOT_FOUND,
            AppError::Session(_) => StatusCode::CONFLICT,
            AppError::Generation(err) => match err {
                GenerationError::NoResponses => StatusCode::BAD_REQUEST,
                GenerationError::AlreadyInFlight | GenerationError::ReportReady => {
                    StatusCode::CONFLICT
                }
                GenerationError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                GenerationError::PromptFetch(_)
                | GenerationError::Proxy { .. }
                | GenerationError::EmptyReport
                | GenerationError::Transport(_) => StatusCode::BAD_GATEWAY,
            },
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> Option<&'static str> {
        match self {
            AppError::Generation(err) => Some(err.kind()),
            _ => None,
        }
    }
}

fn get_trace_id() -> Option<String> {
    let span = Span::current();
    let context = span.context();
    let span_ref = context.span();
    let span_context = span_ref.span_context();

    if span_context.is_valid() {
        Some(span_context.trace_id().to_string())
    } else {
        None
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error_message = match &self {
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                "Internal server error".to_string()
            }
            AppError::Generation(err) => {
                tracing::warn!(error = %err, "Report generation error");
                err.to_string()
            }
            AppError::Session(err) => err.to_string(),
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
        };

        let mut body = json!({
            "error": error_message,
            "status": status.as_u16(),
        });
        if let Some(kind) = self.kind() {
            body["kind"] = json!(kind);
        }
        if let Some(trace_id) = get_trace_id() {
            body["trace_id"] = json!(trace_id);
        }

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaire::QuestionId;

    #[test]
    fn test_validation_error() {
        let error = AppError::Validation("text is required".to_string());
        assert_eq!(error.to_string(), "Validation error: text is required");
    }

    #[test]
    fn test_generation_error_is_transparent() {
        let error = AppError::from(GenerationError::EmptyReport);
        assert_eq!(error.to_string(), GenerationError::EmptyReport.to_string());
        assert_eq!(error.kind(), Some("empty_report"));
    }

    #[test]
    fn test_error_status_codes() {
        let test_cases = vec![
            (
                AppError::Validation("test".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::NotFound("test".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (AppError::Session(SessionError::Busy), StatusCode::CONFLICT),
            (
                AppError::Session(SessionError::ReportReady),
                StatusCode::CONFLICT,
            ),
            (
                AppError::Session(SessionError::UnknownQuestion(QuestionId::new(9, 9))),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::Generation(GenerationError::NoResponses),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Generation(GenerationError::AlreadyInFlight),
                StatusCode::CONFLICT,
            ),
            (
                AppError::Generation(GenerationError::ReportReady),
                StatusCode::CONFLICT,
            ),
            (
                AppError::Generation(GenerationError::Timeout),
                StatusCode::GATEWAY_TIMEOUT,
            ),
            (
                AppError::Generation(GenerationError::Proxy {
                    status: 500,
                    body: "boom".to_string(),
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::Internal("test".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected_status) in test_cases {
            assert_eq!(error.status(), expected_status, "{error}");
        }
    }

    #[test]
    fn test_response_status_matches() {
        let response = AppError::Generation(GenerationError::AlreadyInFlight).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
