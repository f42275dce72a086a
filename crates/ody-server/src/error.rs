//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`; any [`ody_core::Error`]
//! converts into an [`AppError`] with `?`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};

/// Wrapper so we can implement `IntoResponse` for an external type.
pub struct AppError {
    inner: ody_core::Error,
    request_id: Option<String>,
    details: Option<Value>,
}

impl AppError {
    pub fn new(inner: ody_core::Error) -> Self {
        Self {
            inner,
            request_id: None,
            details: None,
        }
    }

    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }

    /// Merge the fields of `details` (a JSON object) into the body.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn inner(&self) -> &ody_core::Error {
        &self.inner
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.inner.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<ody_core::Error> for AppError {
    fn from(e: ody_core::Error) -> Self {
        Self::new(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                error = %self.inner,
                "Server error in API handler"
            );
        }

        let code = match &self.inner {
            ody_core::Error::NotFound { .. } => "not_found",
            ody_core::Error::Unauthorized(_) => "unauthorized",
            ody_core::Error::Forbidden(_) => "forbidden",
            ody_core::Error::Validation(_) => "validation_error",
            ody_core::Error::Conflict(_) => "conflict",
            ody_core::Error::RateLimited(_) => "rate_limited",
            ody_core::Error::Config(_) => "config_error",
            ody_core::Error::Upstream { .. } => "upstream_error",
            ody_core::Error::Database { .. } => "database_error",
            ody_core::Error::Io { .. } => "io_error",
            ody_core::Error::Internal(_) => "internal_error",
        };

        let mut body = json!({
            "error": self.inner.to_string(),
            "code": code,
            "request_id": self.request_id,
        });

        if let ody_core::Error::Upstream {
            status: Some(upstream_status),
            ..
        } = &self.inner
        {
            body["upstream_status"] = json!(upstream_status);
        }

        if let (Some(Value::Object(extra)), Value::Object(map)) = (self.details, &mut body) {
            for (k, v) in extra {
                map.entry(k).or_insert(v);
            }
        }

        (status, axum::Json(body)).into_response()
    }
}
