use serde::Serialize;
use thiserror::Error;

use crate::questionnaire::QuestionId;

/// Why a report generation attempt did not produce a report. The session stays
/// usable after any of them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error("NoResponses: no responses provided, answer at least one question")]
    NoResponses,

    #[error("PromptFetchError: {0}")]
    PromptFetch(String),

    #[error("ProxyError: {status}, {body}")]
    Proxy { status: u16, body: String },

    #[error("EmptyReport: no report content in response")]
    EmptyReport,

    #[error("Timeout: report generation took too long")]
    Timeout,

    #[error("AlreadyInFlight: a report is already being generated")]
    AlreadyInFlight,

    #[error("ReportReady: a report is ready, start a new analysis before generating again")]
    ReportReady,

    #[error("TransportError: {0}")]
    Transport(String),
}

impl GenerationError {
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::NoResponses => "no_responses",
            GenerationError::PromptFetch(_) => "prompt_fetch_error",
            GenerationError::Proxy { .. } => "proxy_error",
            GenerationError::EmptyReport => "empty_report",
            GenerationError::Timeout => "timeout",
            GenerationError::AlreadyInFlight => "already_in_flight",
            GenerationError::ReportReady => "report_ready",
            GenerationError::Transport(_) => "transport_error",
        }
    }
}

/// Serialized form used in session views.
#[derive(Debug, Clone, Serialize)]
pub struct FailureView {
    pub kind: &'static str,
    pub message: String,
}

impl From<&GenerationError> for FailureView {
    fn from(err: &GenerationError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// A questionnaire edit the session cannot accept in its current stage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("a report is being generated, wait for it to finish")]
    Busy,

    #[error("the report is ready, start a new analysis to edit answers")]
    ReportReady,

    #[error("question {0} does not exist")]
    UnknownQuestion(QuestionId),
}
