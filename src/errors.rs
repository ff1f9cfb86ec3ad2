use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::services::upload_service::UploadError;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 400 Bad Request (caller fault).
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

/// Map the upload taxonomy onto wire statuses: validation faults are the
/// caller's (400), a missing photo is distinguishable (404), everything
/// storage-side is internal (500). Storage internals reach the caller only
/// as the wrapped diagnostic message, never verbatim.
impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match &err {
            UploadError::EmptyBatch
            | UploadError::BatchTooLarge(_)
            | UploadError::LookupUnsupported => AppError::invalid_argument(err.to_string()),
            UploadError::PhotoNotFound(_) => AppError::not_found(err.to_string()),
            UploadError::Avatar(source)
            | UploadError::Url(source)
            | UploadError::Photo { source, .. }
            | UploadError::PhotoUrl { source, .. }
            | UploadError::Lookup { source, .. } => {
                AppError::internal(format!("{}: {}", err, source))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let app: AppError = UploadError::EmptyBatch.into();
        assert_eq!(app.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_missing_photo_maps_to_not_found() {
        let app: AppError = UploadError::PhotoNotFound("abc.jpg".into()).into();
        assert_eq!(app.status, StatusCode::NOT_FOUND);
        assert!(app.message.contains("abc.jpg"));
    }
}
