//! HTTP surface: control-plane routes and viewer-facing stream files.

pub mod handlers;

use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::state::AppState;

/// Build the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let stream_dir = state.layout.root().join("stream");

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/version", get(handlers::version_check))
        .route("/start-processing", post(handlers::start_processing))
        .route("/process-new-languages", post(handlers::process_new_languages))
        .route("/stop-processing", post(handlers::stop_processing))
        .nest_service("/stream", ServeDir::new(stream_dir))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
