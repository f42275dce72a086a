//! Liveness endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::context::AppContext;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: bool,
    pub generation_configured: bool,
    pub exchange_configured: bool,
}

/// GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unavailable", body = HealthResponse)
    )
)]
pub async fn health_check(State(ctx): State<AppContext>) -> (StatusCode, Json<HealthResponse>) {
    let database = ody_db::pool::get_conn(&ctx.db)
        .map(|conn| conn.query_row("SELECT 1", [], |_| Ok(())).is_ok())
        .unwrap_or(false);

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if database { "ok" } else { "degraded" },
            version: env!("CARGO_PKG_VERSION"),
            database,
            generation_configured: ctx.gemini.is_configured(),
            exchange_configured: ctx.exchange.is_configured(),
        }),
    )
}
