//! Presentation layer: wire-level validation and translation only.

pub mod health_handlers;
pub mod upload_handlers;
