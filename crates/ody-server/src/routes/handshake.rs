//! Agent handshake gateway.
//!
//! Two-stage exchange on a single endpoint. The initial handshake registers
//! the agent and hands out a challenge; the identity response must carry the
//! gateway's constitutional hash and an Ed25519 signature over that challenge
//! by the key the agent registered with. Every rejection past field
//! validation leaves an audit row.

use axum::body::Bytes;
use axum::extract::{Extension, State};
use axum::Json;
use chrono::{DateTime, Utc};
use ody_db::models::Agent;
use ody_db::pool::PooledConnection;
use ody_db::queries::agents;
use ody_db::queries::audit::NewAuditEntry;
use ody_raip::{Handshake, Manifest, RaipError, Stage};
use serde::Serialize;
use serde_json::{json, Value};

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;
use crate::routes::parse_json;

const AUDIT_TABLE: &str = "agent_registry";

const OP_RATE_LIMIT: &str = "RAIP_RATE_LIMIT_EXCEEDED";
const OP_DRIFT: &str = "RAIP_TIMESTAMP_DRIFT";
const OP_FAILURE: &str = "RAIP_HANDSHAKE_FAILURE";

const HASH_MISMATCH: &str = "Constitutional Hash verification failed. Governance alignment required.";

#[derive(Serialize, utoipa::ToSchema)]
pub struct ChallengeResponse {
    pub challenge: String,
    pub expires_at: String,
    pub expected_constitutional_hash: String,
    #[schema(value_type = Object)]
    pub governance_manifest: Manifest,
    pub trust_level: String,
    pub message: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VerifiedResponse {
    pub success: bool,
    pub trust_level: String,
    pub message: String,
    pub session_ttl: Option<u64>,
}

/// POST /raip/handshake
#[utoipa::path(
    post,
    path = "/raip/handshake",
    request_body(content = serde_json::Value, description = "Initial handshake or identity response"),
    responses(
        (status = 200, description = "Challenge issued, or identity verified", body = serde_json::Value),
        (status = 400, description = "Missing fields, unsupported version, or clock drift"),
        (status = 403, description = "Hash, challenge, key, or signature rejected"),
        (status = 429, description = "Per-agent rate limit exceeded"),
        (status = 500, description = "Internal server error during handshake")
    )
)]
pub async fn handshake(
    State(ctx): State<AppContext>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    handle(&ctx, &body).await.map_err(|e| {
        let internal = matches!(
            e.inner(),
            ody_core::Error::Database { .. }
                | ody_core::Error::Io { .. }
                | ody_core::Error::Internal(_)
        );
        if !internal {
            return e.with_request_id(request_id);
        }
        // Storage details stay in the log.
        tracing::error!(error = %e.inner(), "Handshake failed");
        AppError::new(ody_core::Error::Internal(
            "Internal server error during handshake".into(),
        ))
        .with_request_id(request_id)
    })
}

async fn handle(ctx: &AppContext, body: &Bytes) -> Result<Json<Value>, AppError> {
    let msg: Handshake = parse_json(body)?;
    let timestamp = msg.validate().map_err(ody_core::Error::from)?;
    let limits = &ctx.config.raip;

    if ctx.raip_limiter.check_key(&msg.agent_id).is_err() {
        temptation(
            ctx,
            OP_RATE_LIMIT,
            format!(
                "Agent {} exceeded rate limit ({} req/min)",
                msg.agent_id, limits.requests_per_minute
            ),
            json!({ "agent_id": msg.agent_id, "timestamp": Utc::now().to_rfc3339() }),
        );
        return Err(ody_core::Error::RateLimited(format!(
            "Maximum {} requests per minute.",
            limits.requests_per_minute
        ))
        .into());
    }

    let now = Utc::now();
    if let Err(e) = ody_raip::check_drift(now.timestamp_millis(), timestamp, limits.max_drift_ms) {
        if let RaipError::TimestampDrift { drift_ms, .. } = e {
            temptation(
                ctx,
                OP_DRIFT,
                format!("Agent {} timestamp drift: {drift_ms}ms", msg.agent_id),
                json!({ "agent_id": msg.agent_id, "drift_ms": drift_ms }),
            );
        }
        return Err(ody_core::Error::from(e).into());
    }

    let manifest = Manifest::gateway();
    let expected_hash = manifest.hash();

    let conn = ody_db::pool::get_conn(&ctx.db)?;
    let existing = agents::get_agent(&conn, &msg.agent_id)?;

    match msg.stage() {
        Stage::Initial => {
            let agent = register_or_touch(ctx, &conn, &msg, existing)?;
            let challenge = ody_raip::issue_challenge(now, limits.challenge_ttl_secs);
            agents::set_challenge(&conn, &msg.agent_id, &challenge.value, challenge.expires_at)?;

            tracing::info!(agent_id = %msg.agent_id, "Handshake challenge issued");

            let resp = ChallengeResponse {
                challenge: challenge.value,
                expires_at: challenge.expires_at.to_rfc3339(),
                expected_constitutional_hash: expected_hash,
                governance_manifest: manifest,
                trust_level: agent.trust_level.to_string(),
                message: "Sign challenge and provide constitutional_hash to complete handshake"
                    .into(),
            };
            Ok(Json(to_value(&resp)?))
        }
        Stage::IdentityResponse => {
            let provided = msg.constitutional_hash.as_deref().unwrap_or_default();
            if provided != expected_hash {
                temptation(
                    ctx,
                    OP_FAILURE,
                    format!("Agent {} failed Constitutional Hash verification", msg.agent_id),
                    json!({
                        "agent_id": msg.agent_id,
                        "provided_hash": provided,
                        "expected_hash": expected_hash,
                        "flaggedTerms": ["hash_mismatch"],
                    }),
                );
                return Err(AppError::new(ody_core::Error::Forbidden(HASH_MISMATCH.into()))
                    .with_details(json!({ "expected_governance": manifest })));
            }

            let agent = match verify_identity(&msg, existing, now) {
                Ok(agent) => agent,
                Err(reason) => {
                    temptation(
                        ctx,
                        OP_FAILURE,
                        format!("Agent {} failed identity verification: {reason}", msg.agent_id),
                        json!({ "agent_id": msg.agent_id, "reason": reason }),
                    );
                    return Err(ody_core::Error::Forbidden(reason).into());
                }
            };

            let trust_level = agent.trust_level.promote();
            let challenge = msg.challenge.as_deref().unwrap_or_default();
            let verified = agents::record_verification(
                &conn,
                &msg.agent_id,
                challenge,
                now,
                trust_level,
                provided,
            )?;
            if verified.is_none() {
                // Another response consumed the challenge first.
                let reason = "challenge has already been used".to_string();
                temptation(
                    ctx,
                    OP_FAILURE,
                    format!("Agent {} replayed a consumed challenge", msg.agent_id),
                    json!({ "agent_id": msg.agent_id, "reason": reason }),
                );
                return Err(ody_core::Error::Forbidden(reason).into());
            }

            ctx.audit(
                NewAuditEntry::security("RAIP_HANDSHAKE_SUCCESS", "info")
                    .table(AUDIT_TABLE)
                    .metadata(json!({
                        "agent_id": msg.agent_id,
                        "trust_level": trust_level,
                        "constitutional_hash": provided,
                    })),
            );
            tracing::info!(agent_id = %msg.agent_id, %trust_level, "Agent authenticated");

            let resp = VerifiedResponse {
                success: true,
                trust_level: trust_level.to_string(),
                message: format!("Agent {} authenticated successfully", msg.agent_id),
                session_ttl: msg.session_ttl,
            };
            Ok(Json(to_value(&resp)?))
        }
    }
}

/// Register a first-time agent, or refresh a known one presenting the same key.
///
/// Registration never overwrites a row, so when two first contacts race the
/// loser is checked against the winner's key like any returning agent.
fn register_or_touch(
    ctx: &AppContext,
    conn: &PooledConnection,
    msg: &Handshake,
    existing: Option<Agent>,
) -> Result<Agent, AppError> {
    let known = existing.is_some();
    let agent = match existing {
        Some(agent) => agent,
        None => {
            ody_raip::parse_public_key(&msg.public_key)
                .map_err(|e| ody_core::Error::Validation(e.to_string()))?;
            let agent = agents::register_agent(
                conn,
                &msg.agent_id,
                msg.public_key.trim(),
                &msg.capabilities,
            )?;
            tracing::info!(agent_id = %agent.agent_id, "Agent registered");
            agent
        }
    };

    if agent.public_key.eq_ignore_ascii_case(msg.public_key.trim()) {
        if known {
            agents::touch_handshake(conn, &agent.agent_id)?;
        }
        return Ok(agent);
    }
    let reason = "public key does not match the registered key".to_string();
    temptation(
        ctx,
        OP_FAILURE,
        format!("Agent {} presented a different public key", agent.agent_id),
        json!({ "agent_id": agent.agent_id, "reason": reason }),
    );
    Err(ody_core::Error::Forbidden(reason).into())
}

/// Check key, challenge and signature for an identity response. The error
/// is a human-readable rejection reason.
fn verify_identity(
    msg: &Handshake,
    existing: Option<Agent>,
    now: DateTime<Utc>,
) -> Result<Agent, String> {
    let agent = existing.ok_or("agent is not registered; send an initial handshake first")?;

    if !agent.public_key.eq_ignore_ascii_case(msg.public_key.trim()) {
        return Err("public key does not match the registered key".into());
    }

    let pending = agent
        .pending_challenge
        .as_deref()
        .ok_or("no pending challenge; send an initial handshake first")?;

    let expired = agent
        .challenge_expires_at
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| now >= t.with_timezone(&Utc))
        .unwrap_or(true);
    if expired {
        return Err("challenge has expired".into());
    }

    if msg.challenge.as_deref() != Some(pending) {
        return Err("challenge does not match the issued challenge".into());
    }

    let signature = msg.signature.as_deref().ok_or("signature is required")?;
    ody_raip::verify_signature(&agent.public_key, pending, signature)
        .map_err(|e| e.to_string())?;

    Ok(agent)
}

/// Audit a suspicious handshake.
fn temptation(ctx: &AppContext, operation: &str, message: String, mut metadata: Value) {
    tracing::warn!(operation, %message, "Handshake rejected");
    metadata["message"] = Value::String(message);
    ctx.audit(
        NewAuditEntry::security("TEMPTATIONS", "warning")
            .table(AUDIT_TABLE)
            .operation(operation)
            .metadata(metadata),
    );
}

fn to_value<T: Serialize>(v: &T) -> ody_core::Result<Value> {
    serde_json::to_value(v).map_err(|e| ody_core::Error::Internal(e.to_string()))
}
