//! Control-plane handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::state::AppState;

/// Custom error response for control-plane operations
#[derive(Debug)]
pub enum HttpError {
    BadRequest(String),
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            HttpError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            HttpError::InternalError(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct StartProcessingRequest {
    pub url: String,
    #[serde(default)]
    pub languages: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LanguagesRequest {
    #[serde(default)]
    pub languages: Vec<String>,
}

fn require_languages(languages: &[String]) -> Result<(), HttpError> {
    if languages.is_empty() {
        return Err(HttpError::BadRequest("Languages array is required".into()));
    }
    Ok(())
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Version information endpoint
pub async fn version_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "online",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Start segmenting a source stream and translating it into the given
/// languages.
pub async fn start_processing(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartProcessingRequest>,
) -> Result<Json<serde_json::Value>, HttpError> {
    if req.url.is_empty() {
        return Err(HttpError::BadRequest(
            "Stream URL and languages are required".into(),
        ));
    }
    require_languages(&req.languages)?;

    for language in &req.languages {
        state
            .activate_language(language)
            .map_err(|e| HttpError::InternalError(e.to_string()))?;
    }

    let mut segmenter = state.segmenter.lock().await;
    if segmenter.is_none() {
        let spawned = crate::segmenter::Segmenter::spawn(
            &state.config.media.ffmpeg,
            &req.url,
            &state.layout.chunks_dir(),
            state.config.pipeline.chunk_secs,
        )
        .map_err(|e| HttpError::InternalError(e.to_string()))?;
        *segmenter = Some(spawned);
    }
    drop(segmenter);

    state.ensure_watcher();

    Ok(Json(serde_json::json!({ "message": "Processing started..." })))
}

/// Activate additional languages mid-stream.
pub async fn process_new_languages(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LanguagesRequest>,
) -> Result<Json<serde_json::Value>, HttpError> {
    require_languages(&req.languages)?;

    let mut added = Vec::new();
    for language in &req.languages {
        let activated = state
            .activate_language(language)
            .map_err(|e| HttpError::InternalError(e.to_string()))?;
        if activated {
            added.push(language.clone());
        }
    }

    if added.is_empty() {
        return Ok(Json(serde_json::json!({
            "message": "No new languages to process"
        })));
    }

    Ok(Json(serde_json::json!({
        "message": format!("Processing new languages: {}", added.join(", "))
    })))
}

/// Stop translating into the given languages.
pub async fn stop_processing(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LanguagesRequest>,
) -> Result<Json<serde_json::Value>, HttpError> {
    require_languages(&req.languages)?;

    let mut stopped = Vec::new();
    for language in &req.languages {
        if state.deactivate_language(language).await {
            stopped.push(language.clone());
        }
    }

    if stopped.is_empty() {
        return Ok(Json(serde_json::json!({
            "message": "No matching active languages found to stop"
        })));
    }

    // Last language gone: nothing left to feed, stop the segmenter too.
    if state.languages.is_empty() {
        if let Some(segmenter) = state.segmenter.lock().await.take() {
            segmenter.stop().await;
        }
    }

    Ok(Json(serde_json::json!({
        "message": format!("Stopped processing for languages: {}", stopped.join(", "))
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_language_list_is_rejected() {
        assert!(require_languages(&[]).is_err());
        assert!(require_languages(&["french".into()]).is_ok());
    }

    #[test]
    fn request_bodies_deserialize() {
        let req: StartProcessingRequest = serde_json::from_str(
            r#"{"url":"rtp://127.0.0.1:1234","languages":["french","spanish"]}"#,
        )
        .unwrap();
        assert_eq!(req.languages.len(), 2);

        let req: LanguagesRequest = serde_json::from_str(r#"{"languages":[]}"#).unwrap();
        assert!(req.languages.is_empty());
    }
}
