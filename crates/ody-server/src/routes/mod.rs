//! Route handlers for the HTTP API.

pub mod admin;
pub mod chat;
pub mod guard;
pub mod handshake;
pub mod health;
pub mod proposals;
pub mod trading;

use axum::body::Bytes;
use serde::de::DeserializeOwned;

/// Decode a JSON request body, reporting malformed input as a validation
/// error (400) rather than axum's default rejection.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &Bytes) -> ody_core::Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| ody_core::Error::Validation(format!("Invalid JSON: {e}")))
}

/// Clamp a user-supplied page size.
pub(crate) fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 500)
}
