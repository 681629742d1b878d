use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::questionnaire::{Catalog, QuestionId, SectionStatus};
use crate::report::{FailureView, GenerationState, Session, Stage};
use crate::telemetry::metrics::ANSWERS_RECORDED;

#[derive(Debug, Serialize)]
pub struct CatalogView {
    pub total_questions: usize,
    pub sections: Vec<SectionView>,
}

#[derive(Debug, Serialize)]
pub struct SectionView {
    pub title: String,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub id: QuestionId,
    pub prompt: String,
    pub hint: String,
}

impl From<&Catalog> for CatalogView {
    fn from(catalog: &Catalog) -> Self {
        let sections = catalog
            .sections()
            .iter()
            .enumerate()
            .map(|(section_idx, section)| SectionView {
                title: section.title.clone(),
                questions: section
                    .questions
                    .iter()
                    .enumerate()
                    .map(|(question_idx, question)| QuestionView {
                        id: QuestionId::new(section_idx, question_idx),
                        prompt: question.prompt.clone(),
                        hint: question.hint_or_default().to_string(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            total_questions: catalog.total_questions(),
            sections,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CurrentQuestionView {
    pub id: QuestionId,
    pub section_index: usize,
    pub section_title: String,
    pub question_in_section: usize,
    pub questions_in_section: usize,
    pub prompt: String,
    pub hint: String,
    pub answer: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GenerationView {
    Idle,
    InFlight {
        generation_id: Uuid,
        started_at: DateTime<Utc>,
    },
    Succeeded {
        report: String,
        generated_at: DateTime<Utc>,
    },
    Failed {
        error: FailureView,
    },
}

impl From<&GenerationState> for GenerationView {
    fn from(state: &GenerationState) -> Self {
        match state {
            GenerationState::Idle => GenerationView::Idle,
            GenerationState::InFlight {
                generation_id,
                started_at,
            } => GenerationView::InFlight {
                generation_id: *generation_id,
                started_at: *started_at,
            },
            GenerationState::Succeeded {
                report,
                generated_at,
            } => GenerationView::Succeeded {
                report: report.clone(),
                generated_at: *generated_at,
            },
            GenerationState::Failed(err) => GenerationView::Failed { error: err.into() },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub stage: Stage,
    pub cursor: usize,
    pub total_questions: usize,
    pub answered_count: usize,
    pub progress_percent: Option<f64>,
    pub current: Option<CurrentQuestionView>,
    pub sections: Vec<SectionStatus>,
    pub generation: GenerationView,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        let questionnaire = session.questionnaire();

        let current = match (
            questionnaire.current_id(),
            questionnaire.current_question(),
            questionnaire.section_position(),
        ) {
            (Some(id), Some(question), Some(position)) => Some(CurrentQuestionView {
                id,
                section_index: position.section_index,
                section_title: position.section_title,
                question_in_section: position.question_in_section,
                questions_in_section: position.questions_in_section,
                prompt: question.prompt.clone(),
                hint: question.hint_or_default().to_string(),
                answer: questionnaire.answer(id).unwrap_or_default().to_string(),
            }),
            _ => None,
        };

        Self {
            stage: session.stage(),
            cursor: questionnaire.cursor(),
            total_questions: questionnaire.total_questions(),
            answered_count: questionnaire.answered_count(),
            progress_percent: questionnaire.progress_fraction().map(|f| f * 100.0),
            current,
            sections: questionnaire.section_overview(),
            generation: session.generation().into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordAnswerBody {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct JumpBody {
    pub index: i64,
}

fn validated<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::Validation(rejection.body_text()))
}

pub async fn get_catalog(State(state): State<AppState>) -> Json<CatalogView> {
    Json(CatalogView::from(state.catalog.as_ref()))
}

pub async fn get_session(State(state): State<AppState>) -> Json<SessionView> {
    let session = state.session.lock().await;
    Json(SessionView::from(&*session))
}

pub async fn record_answer(
    State(state): State<AppState>,
    Path((section, question)): Path<(usize, usize)>,
    body: Result<Json<RecordAnswerBody>, JsonRejection>,
) -> AppResult<Json<SessionView>> {
    let body = validated(body)?;
    let mut session = state.session.lock().await;
    session.record_answer(QuestionId::new(section, question), body.text)?;
    ANSWERS_RECORDED.add(1, &[]);

    Ok(Json(SessionView::from(&*session)))
}

pub async fn advance(State(state): State<AppState>) -> AppResult<Json<SessionView>> {
    let mut session = state.session.lock().await;
    session.advance()?;
    Ok(Json(SessionView::from(&*session)))
}

pub async fn retreat(State(state): State<AppState>) -> AppResult<Json<SessionView>> {
    let mut session = state.session.lock().await;
    session.retreat()?;
    Ok(Json(SessionView::from(&*session)))
}

/// Out-of-range (including negative) indexes leave the cursor where it is.
pub async fn jump(
    State(state): State<AppState>,
    body: Result<Json<JumpBody>, JsonRejection>,
) -> AppResult<Json<SessionView>> {
    let body = validated(body)?;
    let mut session = state.session.lock().await;
    if let Ok(index) = usize::try_from(body.index) {
        session.jump_to(index)?;
    }
    Ok(Json(SessionView::from(&*session)))
}

pub async fn review(State(state): State<AppState>) -> AppResult<Json<SessionView>> {
    let mut session = state.session.lock().await;
    session.review()?;
    Ok(Json(SessionView::from(&*session)))
}

pub async fn reset(State(state): State<AppState>) -> AppResult<Json<SessionView>> {
    let mut session = state.session.lock().await;
    session.reset()?;
    tracing::info!("Session reset for a new analysis");
    Ok(Json(SessionView::from(&*session)))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    use super::*;
    use crate::proxy::{ProxySettings, ProxyState};
    use crate::questionnaire::{Question, Section};
    use crate::report::{
        GenerationTimeouts, HttpPromptSource, ProxyCompletionClient, ReportOrchestrator,
    };
    use crate::routes::create_router;

    fn session() -> Session {
        Session::new(Arc::new(Catalog::new(vec![
            Section::new("One", vec![Question::new("q1").with_hint("h1")]),
            Section::new("Two", vec![Question::new("q2")]),
        ])))
    }

    #[test]
    fn test_session_view_initial() {
        let view = SessionView::from(&session());
        assert_eq!(view.stage, Stage::Answering);
        assert_eq!(view.progress_percent, Some(50.0));

        let current = view.current.unwrap();
        assert_eq!(current.section_title, "One");
        assert_eq!(current.hint, "h1");
        assert_eq!(current.answer, "");
    }

    #[test]
    fn test_session_view_serializes_generation_tag() {
        let mut s = session();
        s.review().unwrap();
        let json = serde_json::to_value(SessionView::from(&s)).unwrap();

        assert_eq!(json["stage"], "ready_to_generate");
        assert_eq!(json["generation"]["state"], "idle");
        assert!(json["current"].is_null());
        assert!(json["progress_percent"].is_null());
    }

    #[test]
    fn test_catalog_view_uses_default_hint() {
        let catalog = Catalog::new(vec![Section::new("S", vec![Question::new("plain")])]);
        let view = CatalogView::from(&catalog);
        assert_eq!(
            view.sections[0].questions[0].hint,
            crate::questionnaire::DEFAULT_HINT
        );
    }

    #[test]
    fn test_session_view_lists_sections() {
        let mut s = session();
        s.jump_to(1).unwrap();
        let json = serde_json::to_value(SessionView::from(&s)).unwrap();

        assert_eq!(json["sections"][0]["title"], "One");
        assert_eq!(json["sections"][0]["is_completed"], true);
        assert_eq!(json["sections"][1]["start_index"], 1);
        assert_eq!(json["sections"][1]["is_current"], true);
    }

    fn app() -> axum::Router {
        let catalog = Arc::new(Catalog::clue());
        let unused = "http://127.0.0.1:9/unused";
        create_router(AppState {
            catalog: catalog.clone(),
            session: Session::shared(catalog),
            orchestrator: Arc::new(ReportOrchestrator::new(
                Arc::new(HttpPromptSource::new(unused)),
                Arc::new(ProxyCompletionClient::new(unused)),
                GenerationTimeouts {
                    prompt_fetch: Duration::from_secs(1),
                    completion: Duration::from_secs(1),
                },
            )),
            proxy: ProxyState {
                llm_client: None,
                settings: ProxySettings {
                    model: "test-model".to_string(),
                    max_output_tokens: 100,
                    timeout: Duration::from_secs(1),
                },
            },
        })
    }

    fn json_request(method: Method, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_malformed_answer_body_is_json_validation_error() {
        let response = app()
            .oneshot(json_request(
                Method::PUT,
                "/api/session/answers/0/0",
                "{not json",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["status"], 400);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_wrong_jump_body_is_json_validation_error() {
        let response = app()
            .oneshot(json_request(
                Method::POST,
                "/api/session/jump",
                r#"{"index": "first"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["status"], 400);
    }

    #[tokio::test]
    async fn test_answer_via_router() {
        let response = app()
            .oneshot(json_request(
                Method::PUT,
                "/api/session/answers/0/0",
                r#"{"text": "We onboard in a day"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["answered_count"], 1);
        assert_eq!(json["current"]["answer"], "We onboard in a day");
    }
}
