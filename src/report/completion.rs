use serde::{Deserialize, Serialize};

use super::error::GenerationError;

/// Wire body accepted by the completion proxy.
#[derive(Debug, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    pub transcript: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    report: Option<String>,
}

/// Turns a prompt template plus transcript into report text.
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str, transcript: &str) -> Result<String, GenerationError>;
}

/// Posts to the completion proxy route.
pub struct ProxyCompletionClient {
    client: reqwest::Client,
    url: String,
}

impl ProxyCompletionClient {
    pub fn new(url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl CompletionClient for ProxyCompletionClient {
    #[tracing::instrument(
        name = "completion proxy call",
        skip(self, prompt, transcript),
        fields(proxy.url = %self.url, http.response.status_code, report.length)
    )]
    async fn complete(&self, prompt: &str, transcript: &str) -> Result<String, GenerationError> {
        let body = CompletionRequest {
            prompt: prompt.to_string(),
            transcript: transcript.to_string(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout
                } else {
                    GenerationError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let span = tracing::Span::current();
        span.record("http.response.status_code", status.as_u16() as i64);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), body = %body, "Completion proxy returned an error");
            return Err(GenerationError::Proxy {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let report = parse_report(&text)?;
        span.record("report.length", report.len());

        Ok(report)
    }
}

/// Pulls the `report` field out of a 2xx proxy body.
fn parse_report(body: &str) -> Result<String, GenerationError> {
    serde_json::from_str::<CompletionResponse>(body)
        .ok()
        .and_then(|resp| resp.report)
        .filter(|report| !report.is_empty())
        .ok_or(GenerationError::EmptyReport)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report_present() {
        let report = parse_report(r#"{"report": "OK", "timing": {"totalDuration": 12}}"#).unwrap();
        assert_eq!(report, "OK");
    }

    #[test]
    fn test_parse_report_missing_or_empty() {
        for body in [r#"{}"#, r#"{"report": null}"#, r#"{"report": ""}"#, "not json"] {
            assert_eq!(
                parse_report(body).unwrap_err(),
                GenerationError::EmptyReport,
                "body {body:?}"
            );
        }
    }

    #[test]
    fn test_request_wire_shape() {
        let body = CompletionRequest {
            prompt: "P".to_string(),
            transcript: "T".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"prompt": "P", "transcript": "T"}));
    }
}
