//! Face Enrollment Route

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use metrics::counter;
use proctor::AttemptId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::{ApiError, AppState};

/// Body of `POST /capture-face`
#[derive(Debug, Deserialize)]
pub struct CaptureFaceRequest {
    #[serde(alias = "attemptId", deserialize_with = "super::attempt_id")]
    pub attempt_id: AttemptId,
    #[serde(alias = "frame")]
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct CaptureFaceResponse {
    pub status: &'static str,
}

/// Register the candidate's reference face for an attempt
pub async fn capture_face(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CaptureFaceRequest>, JsonRejection>,
) -> Result<Json<CaptureFaceResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!("Rejected enrollment payload: {}", rejection);
        ApiError::InvalidPayload
    })?;
    if request.image.trim().is_empty() {
        return Err(ApiError::InvalidPayload);
    }

    state
        .orchestrator
        .enroll(request.attempt_id, request.image)
        .await?;
    counter!("proctor_enrollments_total").increment(1);

    Ok(Json(CaptureFaceResponse {
        status: "FACE_REGISTERED",
    }))
}
