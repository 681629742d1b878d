use std::sync::Arc;
use std::time::{Duration, Instant};

use opentelemetry::KeyValue;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::telemetry::metrics::{
    REPORT_GENERATION_DURATION, REPORT_GENERATION_OUTCOMES, REPORT_LENGTH,
};

use super::completion::CompletionClient;
use super::error::GenerationError;
use super::prompt::PromptSource;
use super::session::{Session, SharedSession};

#[derive(Debug, Clone, Copy)]
pub struct GenerationTimeouts {
    pub prompt_fetch: Duration,
    pub completion: Duration,
}

/// Runs one report generation: prompt fetch, then a single completion call,
/// with the outcome written back onto the session.
pub struct ReportOrchestrator {
    prompts: Arc<dyn PromptSource>,
    completions: Arc<dyn CompletionClient>,
    timeouts: GenerationTimeouts,
}

impl ReportOrchestrator {
    pub fn new(
        prompts: Arc<dyn PromptSource>,
        completions: Arc<dyn CompletionClient>,
        timeouts: GenerationTimeouts,
    ) -> Self {
        Self {
            prompts,
            completions,
            timeouts,
        }
    }

    #[tracing::instrument(
        name = "report generate",
        skip_all,
        fields(
            generation.id,
            transcript.length,
            report.length,
            report.outcome,
            report.duration_ms,
        )
    )]
    pub async fn generate_report(&self, session: &Mutex<Session>) -> Result<String, GenerationError> {
        let start = Instant::now();
        let span = tracing::Span::current();

        let ticket = {
            let mut session = session.lock().await;
            match session.begin_generation() {
                Ok(ticket) => ticket,
                Err(err) => {
                    tracing::info!(
                        error = %err,
                        generation.state = session.generation().label(),
                        "Report generation refused"
                    );
                    span.record("report.outcome", err.kind());
                    record_outcome(err.kind());
                    return Err(err);
                }
            }
        };

        span.record("generation.id", ticket.generation_id.to_string());
        span.record("transcript.length", ticket.transcript.len());

        let outcome = self.run(&ticket.transcript).await;

        session
            .lock()
            .await
            .finish_generation(ticket.generation_id, outcome.clone());

        let duration = start.elapsed();
        span.record("report.duration_ms", duration.as_millis() as i64);
        REPORT_GENERATION_DURATION.record(duration.as_secs_f64(), &[]);

        match &outcome {
            Ok(report) => {
                span.record("report.length", report.len());
                span.record("report.outcome", "succeeded");
                REPORT_LENGTH.record(report.len() as f64, &[]);
                record_outcome("succeeded");
            }
            Err(err) => {
                span.record("report.outcome", err.kind());
                tracing::error!(error = %err, "Report generation failed");
                record_outcome(err.kind());
            }
        }

        outcome
    }

    /// Runs the generation on its own task so that dropping the caller cannot
    /// leave the session stuck in flight.
    pub fn spawn_generation(
        self: &Arc<Self>,
        session: SharedSession,
    ) -> JoinHandle<Result<String, GenerationError>> {
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move { orchestrator.generate_report(&session).await })
    }

    async fn run(&self, transcript: &str) -> Result<String, GenerationError> {
        let prompt = tokio::time::timeout(self.timeouts.prompt_fetch, self.prompts.fetch())
            .await
            .map_err(|_| {
                GenerationError::PromptFetch(format!(
                    "timed out after {}ms",
                    self.timeouts.prompt_fetch.as_millis()
                ))
            })??;

        tokio::time::timeout(
            self.timeouts.completion,
            self.completions.complete(&prompt, transcript),
        )
        .await
        .map_err(|_| GenerationError::Timeout)?
    }
}

fn record_outcome(kind: &'static str) {
    REPORT_GENERATION_OUTCOMES.add(1, &[KeyValue::new("report.outcome", kind)]);
}
