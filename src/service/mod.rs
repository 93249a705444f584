//! Verification Trigger REST Service
//!
//! Exposes the trigger over HTTP for importers and member-creation paths.
//!
//! ## Endpoints
//!
//! - `GET /api/verification` - Current verification state and thresholds
//! - `POST /api/verification/start` - Start verification for a known amount
//! - `GET /api/imports/threshold` - Effective import threshold
//! - `POST /api/imports/check` - Strict import volume check (422 when verification is required)
//! - `POST /api/members/events` - Record and publish a member-created event
//! - `GET /health` - Detailed service health check
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe

pub mod routes;
pub mod state;

pub use routes::{create_router, AppState, ApiError, ErrorResponse};
pub use state::ServiceState;
