//! Bearer-token authentication middleware.
//!
//! Resolves `Authorization: Bearer <token>` against the configured tokens and
//! injects the caller's [`UserId`] into request extensions. When auth is
//! disabled every request runs as [`UserId::anonymous`].

use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use ody_core::config::AuthConfig;
use ody_core::UserId;
use sha2::{Digest, Sha256};

use crate::context::AppContext;
use crate::error::AppError;

/// Resolve the caller from a raw `Authorization` header value.
pub fn resolve_user(auth: &AuthConfig, authorization: Option<&str>) -> Option<UserId> {
    if !auth.enabled {
        return Some(UserId::anonymous());
    }

    let token = authorization?.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }

    let presented = digest(token);
    auth.tokens
        .iter()
        .filter(|t| !t.token.is_empty())
        .find(|t| digest(&t.token) == presented)
        .map(|t| t.user_id)
}

/// Tokens are compared by SHA-256 digest, never byte by byte.
fn digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

/// Authentication middleware. Applied to protected routes only.
pub async fn auth_middleware(
    State(ctx): State<AppContext>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let authorization = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match resolve_user(&ctx.config.auth, authorization) {
        Some(user_id) => {
            request.extensions_mut().insert(user_id);
            Ok(next.run(request).await)
        }
        None => Err(AppError::new(ody_core::Error::Unauthorized(
            "missing or invalid bearer token".into(),
        ))
        .into_response()),
    }
}
