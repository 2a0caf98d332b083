//! Camera-page endpoints: session status, capture, retake, submit
//!
//! The capture flow mirrors the UI: the viewfinder posts its snapshot as
//! an inline data URL, the user either retakes or submits, and a submit
//! drives the full pipeline. A second submit while one is in flight is
//! rejected with a conflict and performs no work.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::blob;
use crate::error::{ApiError, ApiResult};
use crate::pipeline::{SessionStatus, SubmissionOutcome};
use crate::AppState;

/// POST /api/capture request body
#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    /// Inline `data:image/jpeg;base64,...` snapshot
    pub image: String,
}

/// POST /api/submit response body
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    /// Human-readable success line, includes the identified species
    pub status: String,
    pub outcome: SubmissionOutcome,
}

/// GET /api/session - current session view
pub async fn get_session(State(state): State<AppState>) -> Json<SessionStatus> {
    Json(state.pipeline.status().await)
}

/// POST /api/session/restart - reload the flow
///
/// Clears the session and performs exactly one new location acquisition.
pub async fn post_restart(State(state): State<AppState>) -> ApiResult<Json<SessionStatus>> {
    state
        .pipeline
        .restart_session(state.location.clone())
        .await?;
    Ok(Json(state.pipeline.status().await))
}

/// POST /api/capture - hold a snapshot for submission
pub async fn post_capture(
    State(state): State<AppState>,
    Json(request): Json<CaptureRequest>,
) -> ApiResult<Json<SessionStatus>> {
    let image = blob::decode_data_url(&request.image)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    state.pipeline.capture(image).await?;
    Ok(Json(state.pipeline.status().await))
}

/// POST /api/retake - discard the held snapshot
pub async fn post_retake(State(state): State<AppState>) -> ApiResult<Json<SessionStatus>> {
    state.pipeline.retake().await?;
    Ok(Json(state.pipeline.status().await))
}

/// POST /api/submit - run the capture through upload, identify, persist
pub async fn post_submit(State(state): State<AppState>) -> ApiResult<Json<SubmitResponse>> {
    let outcome = state.pipeline.submit().await?;

    Ok(Json(SubmitResponse {
        status: format!("Success! Bird: {}", outcome.identification.species_name),
        outcome,
    }))
}

/// Build camera-page routes
pub fn station_routes() -> Router<AppState> {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/session/restart", post(post_restart))
        .route("/api/capture", post(post_capture))
        .route("/api/retake", post(post_retake))
        .route("/api/submit", post(post_submit))
}
