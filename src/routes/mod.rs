pub mod health;
pub mod report;
pub mod session;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::cors::{Any, CorsLayer};

use crate::AppState;

/// Session API plus the completion proxy. The proxy carries its own CORS
/// headers, so the permissive `CorsLayer` only wraps the session routes.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/health", get(health::health))
        .route("/api/questionnaire", get(session::get_catalog))
        .route("/api/session", get(session::get_session))
        .route(
            "/api/session/answers/{section}/{question}",
            put(session::record_answer),
        )
        .route("/api/session/advance", post(session::advance))
        .route("/api/session/retreat", post(session::retreat))
        .route("/api/session/jump", post(session::jump))
        .route("/api/session/review", post(session::review))
        .route("/api/session/reset", post(session::reset))
        .route("/api/report", post(report::generate_report))
        .route("/api/report/download", get(report::download_report))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    api.merge(crate::proxy::router()).with_state(state)
}
