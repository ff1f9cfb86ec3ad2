//! Defines routes for the avatar and photo upload API.
//!
//! ## Structure
//! - **Upload endpoints**
//!   - `POST /v1/users/{user_id}/avatar` — store a single avatar image
//!   - `POST /v1/users/{user_id}/photos` — store a batch of 1..=5 photos
//!   - `GET  /v1/users/{user_id}/photos/{photo_id}` — resolve a stored
//!     photo id to a retrieval URL (`random` key scheme)
//!
//! Upload bodies are multipart; every file travels in a `file` field.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        upload_handlers::{get_photo_url, upload_avatar, upload_photos},
    },
    services::upload_service::UploadService,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for all upload routes.
///
/// The router carries shared state (`UploadService`) to all handlers.
pub fn routes() -> Router<UploadService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // upload endpoints
        .route("/v1/users/{user_id}/avatar", post(upload_avatar))
        .route("/v1/users/{user_id}/photos", post(upload_photos))
        .route("/v1/users/{user_id}/photos/{photo_id}", get(get_photo_url))
}
