//! Core data models for the upload service.
//!
//! The only durable state lives in the external object store; these types
//! describe content in flight between the wire and that store.

pub mod upload;
