//! Frame Analysis Route

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use metrics::counter;
use proctor::{AttemptId, FrameVerdict};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::{ApiError, AppState};

/// Body of `POST /analyze-frame`
#[derive(Debug, Deserialize)]
pub struct AnalyzeFrameRequest {
    #[serde(alias = "attemptId", deserialize_with = "super::attempt_id")]
    pub attempt_id: AttemptId,
    /// Base64 data URL or bare base64
    pub image: String,
}

/// Analyze one webcam snapshot for an exam attempt
pub async fn analyze_frame(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeFrameRequest>, JsonRejection>,
) -> Result<Json<FrameVerdict>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!("Rejected frame payload: {}", rejection);
        counter!("proctor_rejected_frames_total").increment(1);
        ApiError::InvalidPayload
    })?;
    if request.image.trim().is_empty() {
        return Err(ApiError::InvalidPayload);
    }

    let verdict = state
        .orchestrator
        .process_payload(request.attempt_id, request.image)
        .await?;

    Ok(Json(verdict))
}
