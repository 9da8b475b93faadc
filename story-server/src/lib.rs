//! HTTP service exposing story step generation.
//!
//! `POST /api/story` takes a [`GenerationRequest`] and answers with a
//! validated [`StoryStep`]. Failures are reported as `{"error": ...}` with a
//! non-2xx status so clients can substitute their own fallback step.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::sync::Arc;
use story_core::step::{is_story_step, STORY_LENGTH};
use story_core::{GenerationBoundary, GenerationRequest, StoryStep};

/// Shared state for the story routes.
#[derive(Clone)]
pub struct AppState {
    boundary: Arc<dyn GenerationBoundary>,
}

impl AppState {
    pub fn new(boundary: Arc<dyn GenerationBoundary>) -> Self {
        Self { boundary }
    }
}

/// Creates the story API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/story", post(generate_step))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// Generate one story step.
async fn generate_step(
    State(state): State<AppState>,
    body: Result<Json<GenerationRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    if let Err(e) = request.profile() {
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }
    if !is_story_step(request.current_step) {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("currentStep {} is outside 1..={STORY_LENGTH}", request.current_step),
        );
    }

    tracing::info!(
        step = request.current_step,
        language = %request.language,
        visited = request.visited_steps.len(),
        "generating story step"
    );

    let payload = match state.boundary.request(&request).await {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "story generation failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate story");
        }
    };

    match StoryStep::from_json(&payload) {
        Ok(step) => (StatusCode::OK, Json(step)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "model returned an invalid step");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate story")
        }
    }
}
