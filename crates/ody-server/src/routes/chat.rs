//! Chat relay to the generation API with persisted history.

use axum::body::Bytes;
use axum::extract::{Extension, Path, Query, State};
use axum::Json;
use ody_core::{ChatSessionId, UserId};
use ody_db::models::{ChatSession, ChatTurn};
use ody_db::queries::chat_sessions;
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::AppError;
use crate::gemini::{GenerateRequest, Source};
use crate::routes::guard::refusal_audit;
use crate::routes::{clamp_limit, parse_json};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
    pub sources: Vec<Source>,
    pub model: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ChatSessionResponse {
    pub id: String,
    #[schema(value_type = Vec<Object>)]
    pub history: Vec<ChatTurn>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ChatSession> for ChatSessionResponse {
    fn from(s: ChatSession) -> Self {
        Self {
            id: s.id.to_string(),
            history: s.history,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

fn parse_session_id(raw: &str) -> Result<ChatSessionId, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| ody_core::Error::Validation(format!("Invalid session id: {raw}")).into())
}

/// POST /api/chat
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Model reply", body = ChatResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Prompt refused by the content guard"),
        (status = 404, description = "Session belongs to another user"),
        (status = 500, description = "Generation API key not configured"),
        (status = 502, description = "Generation API failed")
    )
)]
pub async fn chat(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    body: Bytes,
) -> Result<Json<ChatResponse>, AppError> {
    let req: ChatRequest = parse_json(&body)?;

    let prompt = req.prompt.trim();
    if prompt.is_empty() {
        return Err(ody_core::Error::Validation("prompt is required".into()).into());
    }

    let session_id = match req.session_id.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => parse_session_id(raw)?,
        None => ChatSessionId::new(),
    };

    let verdict = ody_guard::check(prompt, Some("chat"));
    if !verdict.approved {
        if let Some(entry) = refusal_audit(&verdict, user_id) {
            ctx.audit(entry.table("chat_sessions"));
        }
        tracing::warn!(%user_id, action = ?verdict.action, "Chat prompt refused");
        return Err(AppError::new(ody_core::Error::Forbidden(verdict.reason.clone()))
            .with_details(serde_json::json!({
                "notice": ody_guard::REFUSAL_NOTICE,
                "action": verdict.action,
            })));
    }

    if !ctx.gemini.is_configured() {
        return Err(ody_core::Error::Config("generation API key is not configured".into()).into());
    }

    let mut contents = {
        let conn = ody_db::pool::get_conn(&ctx.db)?;
        match chat_sessions::get_session(&conn, session_id)? {
            Some(s) if s.user_id != user_id => {
                return Err(ody_core::Error::not_found("chat session", session_id).into());
            }
            Some(s) => s.history,
            None => Vec::new(),
        }
    };

    let user_turn = ChatTurn::user(prompt);
    contents.push(user_turn.clone());

    let generation = ctx
        .gemini
        .generate(&GenerateRequest {
            contents,
            system_instruction: Some(ctx.gemini.system_instruction().to_string()),
            grounded: true,
        })
        .await?;

    let reply = generation.text.trim();
    if reply.is_empty() {
        return Err(ody_core::Error::upstream("gemini", None, "empty reply from model").into());
    }

    {
        let conn = ody_db::pool::get_conn(&ctx.db)?;
        chat_sessions::append_turns(
            &conn,
            session_id,
            user_id,
            &[user_turn, ChatTurn::model(reply)],
        )?;
    }

    tracing::info!(
        session_id = %session_id,
        sources = generation.sources.len(),
        "Chat reply generated"
    );

    Ok(Json(ChatResponse {
        session_id: session_id.to_string(),
        reply: reply.to_string(),
        sources: generation.sources,
        model: generation.model,
    }))
}

/// GET /api/chat/sessions
#[utoipa::path(
    get,
    path = "/api/chat/sessions",
    params(("limit" = Option<i64>, Query, description = "Maximum sessions to return")),
    responses(
        (status = 200, description = "Caller's sessions, most recent first", body = Vec<ChatSessionResponse>)
    )
)]
pub async fn list_sessions(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<ChatSessionResponse>>, AppError> {
    let conn = ody_db::pool::get_conn(&ctx.db)?;
    let sessions = chat_sessions::list_sessions(&conn, user_id, clamp_limit(params.limit))?;
    Ok(Json(sessions.into_iter().map(Into::into).collect()))
}

/// GET /api/chat/sessions/{id}
#[utoipa::path(
    get,
    path = "/api/chat/sessions/{id}",
    params(("id" = String, Path, description = "Chat session id")),
    responses(
        (status = 200, description = "Stored conversation", body = ChatSessionResponse),
        (status = 400, description = "Malformed session id"),
        (status = 404, description = "Session not found")
    )
)]
pub async fn get_session(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Path(id): Path<String>,
) -> Result<Json<ChatSessionResponse>, AppError> {
    let session_id = parse_session_id(&id)?;
    let conn = ody_db::pool::get_conn(&ctx.db)?;
    let session = chat_sessions::get_owned_session(&conn, session_id, user_id)?
        .ok_or_else(|| ody_core::Error::not_found("chat session", session_id))?;
    Ok(Json(session.into()))
}
