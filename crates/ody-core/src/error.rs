//! Unified error type for the odyssey service.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for API handlers to derive an HTTP status code via [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in odyssey.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "chat session", "agent").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The caller lacks permission for the requested action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A conflicting resource already exists.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The caller exceeded a request quota.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// The server is missing configuration required for this request.
    #[error("Server misconfiguration: {0}")]
    Config(String),

    /// A remote API (generation, exchange) failed or returned garbage.
    #[error("Upstream error [{service}]: {message}")]
    Upstream {
        /// Name of the remote service.
        service: String,
        /// HTTP status returned by the remote service, if any.
        status: Option<u16>,
        /// Human-readable error description.
        message: String,
    },

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Unauthorized(_) => 401,
            Error::Forbidden(_) => 403,
            Error::Validation(_) => 400,
            Error::Conflict(_) => 409,
            Error::RateLimited(_) => 429,
            Error::Config(_) => 500,
            Error::Upstream { .. } => 502,
            Error::Database { .. } => 500,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Upstream`].
    pub fn upstream(
        service: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Error::Upstream {
            service: service.into(),
            status,
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = Error::not_found("chat session", "abc-123");
        assert_eq!(err.to_string(), "chat session not found: abc-123");
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn unauthorized_display() {
        let err = Error::Unauthorized("missing bearer token".into());
        assert_eq!(err.to_string(), "Unauthorized: missing bearer token");
        assert_eq!(err.http_status(), 401);
    }

    #[test]
    fn forbidden_display() {
        let err = Error::Forbidden("hash mismatch".into());
        assert_eq!(err.to_string(), "Forbidden: hash mismatch");
        assert_eq!(err.http_status(), 403);
    }

    #[test]
    fn validation_display() {
        let err = Error::Validation("prompt is required".into());
        assert_eq!(err.to_string(), "Validation error: prompt is required");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn rate_limited_display() {
        let err = Error::RateLimited("5 requests per minute".into());
        assert_eq!(err.to_string(), "Rate limit exceeded: 5 requests per minute");
        assert_eq!(err.http_status(), 429);
    }

    #[test]
    fn config_display() {
        let err = Error::Config("missing GEMINI_API_KEY".into());
        assert_eq!(err.to_string(), "Server misconfiguration: missing GEMINI_API_KEY");
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn upstream_display() {
        let err = Error::upstream("exchange", Some(503), "service unavailable");
        assert_eq!(
            err.to_string(),
            "Upstream error [exchange]: service unavailable"
        );
        assert_eq!(err.http_status(), 502);
    }

    #[test]
    fn database_display() {
        let err = Error::database("connection refused");
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn result_alias() {
        fn ok_fn() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(ok_fn().unwrap(), 42);

        fn err_fn() -> Result<i32> {
            Err(Error::Internal("boom".into()))
        }
        assert!(err_fn().is_err());
    }
}
