//! Exam Proctoring API Server
//!
//! HTTP front of the proctoring core: frame analysis, face enrollment,
//! health and Prometheus metrics.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use detection::{DetectionError, DetectorSuite};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use proctor::{Collaborators, FrameOrchestrator};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use storage::{Repository, StorageError};
use thiserror::Error;
use tower_governor::GovernorLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

mod error;
pub mod rate_limit;
mod routes;
pub mod settings;

pub use error::ApiError;
pub use settings::{LoggingSettings, ServerSettings, Settings};

/// Server startup errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Detector setup failed: {0}")]
    Detection(#[from] DetectionError),

    #[error("Storage setup failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Metrics setup failed: {0}")]
    Metrics(String),

    #[error("Invalid rate limit configuration")]
    RateLimit,

    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state shared across handlers
pub struct AppState {
    /// Frame processing and enrollment
    pub orchestrator: FrameOrchestrator,
    /// Event log, scoring and references
    pub repository: Arc<Repository>,
    /// Prometheus render handle, absent when no recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(
        orchestrator: FrameOrchestrator,
        repository: Arc<Repository>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            orchestrator,
            repository,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub metrics: SystemMetrics,
}

/// System metrics
#[derive(Debug, Serialize)]
pub struct SystemMetrics {
    pub tracked_sessions: usize,
    pub scored_attempts: usize,
    pub event_count: usize,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/analyze-frame", post(routes::frames::analyze_frame))
        .route("/capture-face", post(routes::enrollment::capture_face))
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let response = HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        metrics: SystemMetrics {
            tracked_sessions: state.orchestrator.registry().len(),
            scored_attempts: state.repository.attempt_count(),
            event_count: state.repository.event_count(),
        },
    };

    Json(response)
}

/// Prometheus text exposition
async fn metrics_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = state.metrics.as_ref().ok_or(ApiError::MetricsUnavailable)?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}

/// Initialize logging
pub fn init_logging(settings: &LoggingSettings) -> Result<(), ServerError> {
    let level: Level = settings
        .level
        .parse()
        .map_err(|_| ServerError::Logging(format!("unknown level '{}'", settings.level)))?;

    let result = if settings.json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    result.map_err(|e| ServerError::Logging(e.to_string()))
}

/// Build the state, install the metrics recorder and serve until shutdown
pub async fn run_server(settings: Settings) -> Result<(), ServerError> {
    let repository = Arc::new(Repository::from_config(&settings.storage).await?);
    let detectors = DetectorSuite::from_config(&settings.detection)?;
    let orchestrator = FrameOrchestrator::new(
        settings.proctor.clone(),
        detectors,
        Collaborators::from_repository(repository.clone()),
    );

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ServerError::Metrics(e.to_string()))?;

    let state = Arc::new(AppState::new(orchestrator, repository, Some(metrics)));
    let mut app = create_router(state).layer(TraceLayer::new_for_http());

    if settings.server.cors_any_origin {
        app = app.layer(CorsLayer::permissive());
    }

    if settings.rate_limit.enabled {
        let config =
            rate_limit::create_governor_config(&settings.rate_limit).ok_or(ServerError::RateLimit)?;
        app = app.layer(GovernorLayer { config });
    } else {
        warn!("Rate limiting disabled");
    }

    let addr = settings.server.addr();
    info!("Starting proctoring server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use base64::Engine;
    use detection::{
        DirectionThresholds, FaceEmbedder, FaceEmbedding, NoPhoneDetector, PassiveEmbedder,
        PassiveFaceDetector,
    };
    use frame_capture::VideoFrame;
    use image::{ImageFormat, RgbImage};
    use proctor::ProctorConfig;
    use serde_json::{json, Value};
    use std::io::Cursor;
    use storage::ReferenceEmbeddings;
    use tower::ServiceExt;

    struct FixedEmbedder;

    impl FaceEmbedder for FixedEmbedder {
        fn embed(&self, _face_crop: &VideoFrame) -> Result<Option<FaceEmbedding>, DetectionError> {
            Ok(Some(FaceEmbedding::new(vec![0.6, 0.8])))
        }
    }

    fn test_state(embedder: Arc<dyn FaceEmbedder>) -> Arc<AppState> {
        let repository = Arc::new(Repository::default());
        let detectors = DetectorSuite::new(
            Arc::new(PassiveFaceDetector),
            Arc::new(NoPhoneDetector),
            embedder,
            DirectionThresholds::default(),
        );
        let orchestrator = FrameOrchestrator::new(
            ProctorConfig::default(),
            detectors,
            Collaborators::from_repository(repository.clone()),
        );
        let metrics = PrometheusBuilder::new().build_recorder().handle();
        Arc::new(AppState::new(orchestrator, repository, Some(metrics)))
    }

    fn snapshot() -> String {
        let img = RgbImage::from_pixel(64, 48, image::Rgb([120, 110, 100]));
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, ImageFormat::Png).unwrap();
        format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(bytes.into_inner())
        )
    }

    async fn post(state: Arc<AppState>, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = create_router(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(test_state(Arc::new(PassiveEmbedder)));
        let response = app
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["metrics"]["tracked_sessions"], 0);
    }

    #[tokio::test]
    async fn test_analyze_frame() {
        let state = test_state(Arc::new(PassiveEmbedder));
        let (status, body) = post(
            state.clone(),
            "/analyze-frame",
            json!({ "attempt_id": 12, "image": snapshot() }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "faces_detected": 1,
                "direction": "CENTER",
                "gaze": "CENTER",
                "phone_detected": false,
                "status": null,
                "warning": null,
            })
        );
        assert_eq!(state.orchestrator.registry().len(), 1);
    }

    #[tokio::test]
    async fn test_analyze_frame_accepts_camel_case_and_string_id() {
        let state = test_state(Arc::new(PassiveEmbedder));
        let (status, _) = post(
            state.clone(),
            "/analyze-frame",
            json!({ "attemptId": "31", "image": snapshot() }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(state.orchestrator.registry().get(31).is_some());
    }

    #[tokio::test]
    async fn test_invalid_payload() {
        let state = test_state(Arc::new(PassiveEmbedder));

        let (status, body) =
            post(state.clone(), "/analyze-frame", json!({ "attempt_id": 1 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid payload" }));

        let (status, _) = post(
            state.clone(),
            "/analyze-frame",
            json!({ "attempt_id": "abc", "image": snapshot() }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let request = Request::builder()
            .method("POST")
            .uri("/analyze-frame")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = create_router(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert!(state.orchestrator.registry().is_empty());
        assert_eq!(state.repository.event_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_image() {
        let state = test_state(Arc::new(PassiveEmbedder));
        let (status, body) = post(
            state.clone(),
            "/analyze-frame",
            json!({ "attempt_id": 1, "image": "data:image/jpeg;base64,AAAA" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid image" }));
        assert!(state.orchestrator.registry().is_empty());
    }

    #[tokio::test]
    async fn test_capture_face() {
        let state = test_state(Arc::new(FixedEmbedder));
        let (status, body) = post(
            state.clone(),
            "/capture-face",
            json!({ "attempt_id": 5, "frame": snapshot() }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "FACE_REGISTERED" }));
        assert_eq!(
            state.repository.reference_embedding(5).unwrap(),
            Some(vec![0.6, 0.8])
        );
    }

    #[tokio::test]
    async fn test_capture_face_without_embedding() {
        let state = test_state(Arc::new(PassiveEmbedder));
        let (status, body) = post(
            state,
            "/capture-face",
            json!({ "attempt_id": 5, "image": snapshot() }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "FACE_EMBEDDING_FAILED" }));
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = create_router(test_state(Arc::new(PassiveEmbedder)));
        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_unknown_log_level() {
        let settings = LoggingSettings {
            level: "loud".to_string(),
            json: false,
        };
        assert!(matches!(init_logging(&settings), Err(ServerError::Logging(_))));
    }
}
