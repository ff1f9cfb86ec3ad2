//! Bridge to the external S3-compatible object store.
//!
//! `object_store` owns the client handles and primitive operations;
//! `retry` supplies the bounded-backoff combinator the bootstrap sequence
//! runs under.

pub mod object_store;
pub mod retry;
