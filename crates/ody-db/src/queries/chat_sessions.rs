//! Persisted chat conversations.

use chrono::Utc;
use ody_core::{ChatSessionId, Error, Result, UserId};
use rusqlite::Connection;

use crate::models::{ChatSession, ChatTurn};

const COLS: &str = "id, user_id, history, created_at, updated_at";

/// Get a session by id regardless of owner.
pub fn get_session(conn: &Connection, id: ChatSessionId) -> Result<Option<ChatSession>> {
    let q = format!("SELECT {COLS} FROM chat_sessions WHERE id = ?1");
    match conn.query_row(&q, [id.to_string()], ChatSession::from_row) {
        Ok(s) => Ok(Some(s)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Get a session only if `user_id` owns it.
///
/// Sessions owned by someone else are reported as not found so callers
/// cannot probe for foreign session ids.
pub fn get_owned_session(
    conn: &Connection,
    id: ChatSessionId,
    user_id: UserId,
) -> Result<Option<ChatSession>> {
    Ok(get_session(conn, id)?.filter(|s| s.user_id == user_id))
}

/// Append `turns` to a session, creating it if it does not exist.
///
/// Returns `Error::NotFound` if the session exists under another user.
pub fn append_turns(
    conn: &Connection,
    id: ChatSessionId,
    user_id: UserId,
    turns: &[ChatTurn],
) -> Result<ChatSession> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| Error::database(e.to_string()))?;

    let now = Utc::now().to_rfc3339();
    let mut history = match get_session(&tx, id)? {
        Some(s) if s.user_id != user_id => return Err(Error::not_found("chat session", id)),
        Some(s) => s.history,
        None => Vec::new(),
    };
    history.extend_from_slice(turns);
    let encoded = serde_json::to_string(&history).map_err(|e| Error::Internal(e.to_string()))?;

    tx.execute(
        "INSERT INTO chat_sessions (id, user_id, history, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)
         ON CONFLICT(id) DO UPDATE SET
            history = excluded.history,
            updated_at = excluded.updated_at",
        rusqlite::params![id.to_string(), user_id.to_string(), encoded, now],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    tx.commit().map_err(|e| Error::database(e.to_string()))?;

    get_session(conn, id)?.ok_or_else(|| Error::not_found("chat session", id))
}

/// List a user's sessions, most recently updated first.
pub fn list_sessions(conn: &Connection, user_id: UserId, limit: i64) -> Result<Vec<ChatSession>> {
    let q = format!(
        "SELECT {COLS} FROM chat_sessions WHERE user_id = ?1
         ORDER BY updated_at DESC LIMIT ?2"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![user_id.to_string(), limit],
            ChatSession::from_row,
        )
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{get_conn, init_memory_pool};

    #[test]
    fn append_creates_then_extends() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let user = UserId::new();
        let id = ChatSessionId::new();

        let s = append_turns(&conn, id, user, &[ChatTurn::user("hi"), ChatTurn::model("hello")])
            .unwrap();
        assert_eq!(s.history.len(), 2);

        let s = append_turns(&conn, id, user, &[ChatTurn::user("again")]).unwrap();
        assert_eq!(s.history.len(), 3);
        assert_eq!(s.history[2], ChatTurn::user("again"));
    }

    #[test]
    fn foreign_session_is_hidden() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let owner = UserId::new();
        let other = UserId::new();
        let id = ChatSessionId::new();
        append_turns(&conn, id, owner, &[ChatTurn::user("mine")]).unwrap();

        assert!(get_owned_session(&conn, id, other).unwrap().is_none());
        assert!(get_owned_session(&conn, id, owner).unwrap().is_some());

        let err = append_turns(&conn, id, other, &[ChatTurn::user("theirs")]).unwrap_err();
        assert_eq!(err.http_status(), 404);
        let s = get_session(&conn, id).unwrap().unwrap();
        assert_eq!(s.history.len(), 1);
    }

    #[test]
    fn list_is_per_user() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let user = UserId::new();
        for _ in 0..3 {
            append_turns(&conn, ChatSessionId::new(), user, &[ChatTurn::user("x")]).unwrap();
        }
        append_turns(&conn, ChatSessionId::new(), UserId::new(), &[ChatTurn::user("y")]).unwrap();
        assert_eq!(list_sessions(&conn, user, 10).unwrap().len(), 3);
        assert_eq!(list_sessions(&conn, user, 2).unwrap().len(), 2);
    }
}
