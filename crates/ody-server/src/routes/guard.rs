//! Content classifier endpoint.

use axum::body::Bytes;
use axum::extract::{Extension, State};
use axum::Json;
use ody_core::UserId;
use ody_db::queries::audit::NewAuditEntry;
use ody_guard::{Action, Detection, Verdict};
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::AppError;
use crate::routes::parse_json;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct GuardCheckRequest {
    pub input: String,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct GuardCheckResponse {
    #[schema(value_type = Object)]
    pub detection: Detection,
    #[schema(value_type = Object)]
    pub verdict: Verdict,
}

/// Audit row for a refused or escalated input.
pub(crate) fn refusal_audit(verdict: &Verdict, user_id: UserId) -> Option<NewAuditEntry> {
    let log = verdict.log_entry.as_ref()?;
    Some(
        NewAuditEntry::security("WEAPONIZATION_ATTEMPT", log.severity.as_str())
            .operation(match verdict.action {
                Action::ManualReview => "GUARD_MANUAL_REVIEW",
                Action::Reject | Action::Process => "GUARD_REJECT",
            })
            .user(user_id)
            .metadata(serde_json::json!({
                "input_preview": ody_guard::preview(&log.input),
                "context": log.context,
                "flagged_terms": log.flagged_terms,
                "action": verdict.action,
                "reason": verdict.reason,
            })),
    )
}

/// POST /api/guard/check
#[utoipa::path(
    post,
    path = "/api/guard/check",
    request_body = GuardCheckRequest,
    responses(
        (status = 200, description = "Classification result", body = GuardCheckResponse),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn check_input(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    body: Bytes,
) -> Result<Json<GuardCheckResponse>, AppError> {
    let req: GuardCheckRequest = parse_json(&body)?;

    let detection = ody_guard::detect(&req.input);
    let verdict = ody_guard::check(&req.input, req.context.as_deref());

    if let Some(entry) = refusal_audit(&verdict, user_id) {
        tracing::warn!(
            severity = detection.severity.as_str(),
            flagged = detection.flagged_terms.len(),
            "Guard flagged input"
        );
        ctx.audit(entry);
    }

    Ok(Json(GuardCheckResponse { detection, verdict }))
}
