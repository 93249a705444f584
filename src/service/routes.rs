//! Axum routes for the verification trigger service.

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::TriggerConfig;
use crate::error::TriggerError;
use crate::process::VerificationRequest;
use crate::types::{
    MemberCreatedEvent, TriggerOutcome, TriggerPolicy, TriggerSource, VerificationState,
};

use super::state::ServiceState;

/// Type alias for the shared state handed to handlers.
pub type AppState = Arc<ServiceState>;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Current verification status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationStatusResponse {
    /// Verification state.
    pub state: VerificationState,
    /// Configured thresholds.
    pub thresholds: TriggerConfig,
}

/// Effective import threshold (`null` when disabled).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportThresholdResponse {
    /// Threshold after raising the floor to the member count.
    pub threshold: Option<u64>,
}

/// Request to start verification directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartVerificationRequest {
    /// Member count that crossed the threshold.
    pub amount: u64,
    /// Source whose template is used (default: import).
    #[serde(default)]
    pub source: Option<TriggerSource>,
    /// Reject with 422 on a fresh trigger or any failure.
    #[serde(default)]
    pub strict: bool,
}

/// Acknowledgement for a published member event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishEventResponse {
    /// Number of bus subscribers that received the event.
    pub delivered: usize,
}

/// Service health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded".
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Member-created listener is subscribed.
    pub listening: bool,
    /// Database pool state.
    pub database: DatabaseHealth,
}

/// Database health information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseHealth {
    /// Database answered `SELECT 1`.
    pub connected: bool,
    /// Open connections.
    pub pool_size: u32,
    /// Idle connections.
    pub pool_idle: usize,
    /// Maximum pool size.
    pub pool_max: u32,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    /// Always "alive".
    pub status: String,
}

/// Readiness response with dependency status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Service can take traffic.
    pub ready: bool,
    /// Database is reachable.
    pub database: bool,
    /// Why the service is not ready.
    pub details: Option<String>,
}

/// Structured error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response with code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Handler error: status plus body.
pub struct ApiError(StatusCode, ErrorResponse);

impl From<TriggerError> for ApiError {
    fn from(error: TriggerError) -> Self {
        let status = match &error {
            TriggerError::VerificationRequired { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            TriggerError::Store(_) | TriggerError::Mailer(_) => StatusCode::BAD_GATEWAY,
        };
        Self(status, ErrorResponse::new(error.code(), error.to_string()))
    }
}

impl From<crate::store::StoreError> for ApiError {
    fn from(error: crate::store::StoreError) -> Self {
        TriggerError::from(error).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let ApiError(status, body) = self;
        tracing::warn!(
            status = status.as_u16(),
            code = %body.code,
            error = %body.error,
            "Request error"
        );
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Current verification state and configured thresholds.
async fn verification_status_handler(
    State(state): State<AppState>,
) -> Result<Json<VerificationStatusResponse>, ApiError> {
    let verification = state.trigger.verification_state().await?;
    Ok(Json(VerificationStatusResponse {
        state: verification,
        thresholds: *state.trigger.config(),
    }))
}

/// Effective import threshold.
async fn import_threshold_handler(
    State(state): State<AppState>,
) -> Result<Json<ImportThresholdResponse>, ApiError> {
    let threshold = state.trigger.compute_effective_import_threshold().await?;
    Ok(Json(ImportThresholdResponse {
        threshold: threshold.limit(),
    }))
}

/// Strict import volume check; rejects when verification was just requested.
async fn import_check_handler(
    State(state): State<AppState>,
) -> Result<Json<TriggerOutcome>, ApiError> {
    let outcome = state.trigger.check_import_volume(TriggerPolicy::Strict).await?;
    Ok(Json(outcome))
}

/// Start verification directly.
async fn start_verification_handler(
    State(state): State<AppState>,
    Json(request): Json<StartVerificationRequest>,
) -> Result<Json<TriggerOutcome>, ApiError> {
    let request = VerificationRequest::new(request.amount)
        .with_source(request.source.unwrap_or(TriggerSource::Import))
        .throw_on_trigger(request.strict);

    let outcome = state.trigger.start_verification_process(request).await?;
    Ok(Json(outcome))
}

/// Record a member-created event and publish it to the bus.
async fn publish_member_event_handler(
    State(state): State<AppState>,
    Json(event): Json<MemberCreatedEvent>,
) -> Result<(StatusCode, Json<PublishEventResponse>), ApiError> {
    state.store.record_member_created(&event).await?;
    let delivered = state.bus.publish(event);
    Ok((StatusCode::ACCEPTED, Json(PublishEventResponse { delivered })))
}

/// Health check endpoint (detailed).
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = state.store.is_healthy().await;
    let pool_stats = state.store.pool_stats();

    Json(HealthResponse {
        status: if db_healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        listening: state.bus.subscriber_count() > 0,
        database: DatabaseHealth {
            connected: db_healthy,
            pool_size: pool_stats.size,
            pool_idle: pool_stats.idle,
            pool_max: pool_stats.max,
        },
    })
}

/// Liveness probe endpoint. Does NOT check dependencies.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint. 503 until the database answers.
async fn readiness_handler(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    if state.store.is_healthy().await {
        Ok(Json(ReadinessResponse {
            ready: true,
            database: true,
            details: None,
        }))
    } else {
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                database: false,
                details: Some("Database connection failed".to_string()),
            }),
        ))
    }
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the verification trigger service.
pub fn create_router(state: ServiceState) -> Router {
    let state = Arc::new(state);

    Router::new()
        // Verification
        .route("/api/verification", get(verification_status_handler))
        .route("/api/verification/start", post(start_verification_handler))
        // Imports
        .route("/api/imports/threshold", get(import_threshold_handler))
        .route("/api/imports/check", post(import_check_handler))
        // Member events
        .route("/api/members/events", post(publish_member_event_handler))
        // Health checks
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .with_state(state)
}
