//! Append-only security audit log.

use chrono::Utc;
use ody_core::{AuditEntryId, Error, Result, UserId};
use rusqlite::Connection;
use serde_json::Value;

use crate::models::AuditEntry;

const COLS: &str =
    "id, event_type, event_category, severity, table_name, operation, user_id, metadata, created_at";

/// Fields of an audit row; id and timestamp are assigned on insert.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub event_type: String,
    pub event_category: String,
    pub severity: String,
    pub table_name: Option<String>,
    pub operation: Option<String>,
    pub user_id: Option<UserId>,
    pub metadata: Value,
}

impl NewAuditEntry {
    /// A `security` category entry.
    pub fn security(event_type: impl Into<String>, severity: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            event_category: "security".into(),
            severity: severity.into(),
            table_name: None,
            operation: None,
            user_id: None,
            metadata: Value::Object(Default::default()),
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table_name = Some(table.into());
        self
    }

    pub fn operation(mut self, op: impl Into<String>) -> Self {
        self.operation = Some(op.into());
        self
    }

    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

pub fn insert_entry(conn: &Connection, entry: &NewAuditEntry) -> Result<AuditEntry> {
    let id = AuditEntryId::new();
    let now = Utc::now().to_rfc3339();
    conn.execute(
        &format!("INSERT INTO audit_log ({COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
        rusqlite::params![
            id.to_string(),
            entry.event_type,
            entry.event_category,
            entry.severity,
            entry.table_name,
            entry.operation,
            entry.user_id.map(|u| u.to_string()),
            entry.metadata.to_string(),
            now,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    get_entry(conn, id)?.ok_or_else(|| Error::not_found("audit entry", id))
}

pub fn get_entry(conn: &Connection, id: AuditEntryId) -> Result<Option<AuditEntry>> {
    let q = format!("SELECT {COLS} FROM audit_log WHERE id = ?1");
    match conn.query_row(&q, [id.to_string()], AuditEntry::from_row) {
        Ok(e) => Ok(Some(e)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Most recent entries first, optionally restricted to one operation.
pub fn list_entries(
    conn: &Connection,
    operation: Option<&str>,
    limit: i64,
) -> Result<Vec<AuditEntry>> {
    let q = format!(
        "SELECT {COLS} FROM audit_log
         WHERE (?1 IS NULL OR operation = ?1 OR event_type = ?1)
         ORDER BY created_at DESC, rowid DESC LIMIT ?2"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params![operation, limit], AuditEntry::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{get_conn, init_memory_pool};
    use serde_json::json;

    #[test]
    fn insert_and_list() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let user = UserId::new();

        let e = insert_entry(
            &conn,
            &NewAuditEntry::security("TEMPTATIONS", "warning")
                .table("agent_registry")
                .operation("RAIP_TIMESTAMP_DRIFT")
                .metadata(json!({"agent_id": "a", "drift_ms": 45000})),
        )
        .unwrap();
        assert_eq!(e.metadata["drift_ms"], 45000);
        assert!(e.user_id.is_none());

        insert_entry(
            &conn,
            &NewAuditEntry::security("GUARD_REJECT", "critical").user(user),
        )
        .unwrap();

        assert_eq!(list_entries(&conn, None, 10).unwrap().len(), 2);
        let drift = list_entries(&conn, Some("RAIP_TIMESTAMP_DRIFT"), 10).unwrap();
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].table_name.as_deref(), Some("agent_registry"));

        let by_type = list_entries(&conn, Some("GUARD_REJECT"), 10).unwrap();
        assert_eq!(by_type[0].user_id, Some(user));
    }
}
