//! Web front end: upload a PDF, review per-page results, save to a document.
//!
//! | Route              | Action                                            |
//! |--------------------|---------------------------------------------------|
//! | `GET  /`           | upload form                                       |
//! | `POST /`           | validate, run the pipeline, store, redirect       |
//! | `GET  /history`    | list sessions                                     |
//! | `GET  /history/:id`| one session's pages and the save form             |
//! | `POST /save/:id`   | persist the session to a new or existing document |
//!
//! The upload request awaits the whole pipeline before responding. Every
//! request gets its own credentials; the only state shared between requests
//! is the [`SessionStore`].

mod handlers;
pub mod templates;

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::orchestrator::Pipeline;
use crate::session::SessionStore;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use templates::Templates;
use tracing::info;

/// Everything a handler needs, injected through axum state.
pub struct AppState {
    pub config: AnalyzerConfig,
    pub pipeline: Pipeline,
    pub store: SessionStore,
    templates: Templates,
}

impl AppState {
    pub fn new(config: AnalyzerConfig, pipeline: Pipeline) -> Result<Self, AnalyzerError> {
        let templates =
            Templates::new().map_err(|e| AnalyzerError::Internal(format!("templates: {e}")))?;
        Ok(Self {
            config,
            pipeline,
            store: SessionStore::new(),
            templates,
        })
    }
}

/// Build the router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/", get(handlers::upload_form).post(handlers::upload))
        .route("/history", get(handlers::history))
        .route("/history/:id", get(handlers::detail))
        .route("/save/:id", post(handlers::save))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Bind `config.bind_addr` and serve until the process is stopped.
pub async fn serve(config: AnalyzerConfig) -> Result<(), AnalyzerError> {
    let pipeline = Pipeline::from_config(&config)?;
    let addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, pipeline)?);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AnalyzerError::Internal(format!("cannot bind {addr}: {e}")))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .await
        .map_err(|e| AnalyzerError::Internal(format!("server error: {e}")))
}
