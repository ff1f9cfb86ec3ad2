//! Service layer: upload policy and URL issuance.

pub mod upload_service;
