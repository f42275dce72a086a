//! Administrative helpers: policy drop script and recent audit entries.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use ody_db::models::AuditEntry;
use serde::Deserialize;

use crate::context::AppContext;
use crate::error::AppError;
use crate::routes::clamp_limit;

#[derive(Deserialize)]
pub struct DropScriptParams {
    pub table: Option<String>,
}

#[derive(Deserialize)]
pub struct AuditParams {
    pub operation: Option<String>,
    pub limit: Option<i64>,
}

/// GET /api/admin/policies/drop.sql
#[utoipa::path(
    get,
    path = "/api/admin/policies/drop.sql",
    params(("table" = Option<String>, Query, description = "Restrict to one table")),
    responses(
        (status = 200, description = "DROP POLICY script", content_type = "text/plain", body = String)
    )
)]
pub async fn drop_policies(Query(params): Query<DropScriptParams>) -> impl IntoResponse {
    let table = params.table.as_deref().map(str::trim).filter(|t| !t.is_empty());
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        ody_db::policies::drop_script(table),
    )
}

/// GET /api/admin/audit
#[utoipa::path(
    get,
    path = "/api/admin/audit",
    params(
        ("operation" = Option<String>, Query, description = "Operation or event type"),
        ("limit" = Option<i64>, Query, description = "Maximum entries")
    ),
    responses(
        (status = 200, description = "Recent audit entries", body = serde_json::Value)
    )
)]
pub async fn list_audit(
    State(ctx): State<AppContext>,
    Query(params): Query<AuditParams>,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    let conn = ody_db::pool::get_conn(&ctx.db)?;
    let entries = ody_db::queries::audit::list_entries(
        &conn,
        params.operation.as_deref(),
        clamp_limit(params.limit),
    )?;
    Ok(Json(entries))
}
