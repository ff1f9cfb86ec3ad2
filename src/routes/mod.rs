//! Route composition for the upload API.

pub mod routes;
