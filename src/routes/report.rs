use axum::{
    Json,
    extract::State,
    http::header,
    response::IntoResponse,
};

use crate::AppState;
use crate::error::{AppError, AppResult};

use super::session::SessionView;

pub async fn generate_report(State(state): State<AppState>) -> AppResult<Json<SessionView>> {
    state
        .orchestrator
        .spawn_generation(state.session.clone())
        .await
        .map_err(|e| AppError::Internal(format!("generation task failed: {e}")))??;

    let session = state.session.lock().await;
    Ok(Json(SessionView::from(&*session)))
}

pub async fn download_report(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let artifact = state
        .session
        .lock()
        .await
        .report_artifact()
        .ok_or_else(|| AppError::NotFound("No report has been generated yet".into()))?;

    Ok((
        [
            (header::CONTENT_TYPE, artifact.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", artifact.filename),
            ),
        ],
        artifact.content,
    ))
}
