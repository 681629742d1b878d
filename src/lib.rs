pub mod config;
pub mod error;
pub mod llm;
pub mod proxy;
pub mod questionnaire;
pub mod report;
pub mod routes;
pub mod telemetry;

use std::sync::Arc;

use axum::extract::FromRef;

pub use config::Config;

use proxy::ProxyState;
use questionnaire::Catalog;
use report::{ReportOrchestrator, SharedSession};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub session: SharedSession,
    pub orchestrator: Arc<ReportOrchestrator>,
    pub proxy: ProxyState,
}

impl FromRef<AppState> for ProxyState {
    fn from_ref(state: &AppState) -> Self {
        state.proxy.clone()
    }
}
