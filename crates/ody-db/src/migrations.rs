//! Embedded SQL migrations and runner.
//!
//! Migrations are stored as `&str` constants and executed in order.  A
//! `schema_migrations` table tracks which versions have been applied.

use ody_core::{Error, Result};
use rusqlite::Connection;

/// V1: chat sessions, agent registry, audit log.
const V1_INITIAL: &str = r#"
CREATE TABLE chat_sessions (
    id         TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL,
    history    TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE agent_registry (
    agent_id             TEXT PRIMARY KEY,
    agent_name           TEXT NOT NULL,
    public_key           TEXT NOT NULL,
    trust_level          TEXT NOT NULL DEFAULT 'UNTRUSTED',
    constitutional_hash  TEXT,
    capabilities         TEXT NOT NULL DEFAULT '[]',
    pending_challenge    TEXT,
    challenge_expires_at TEXT,
    created_at           TEXT NOT NULL,
    last_handshake_at    TEXT
);

CREATE TABLE audit_log (
    id             TEXT PRIMARY KEY,
    event_type     TEXT NOT NULL,
    event_category TEXT NOT NULL,
    severity       TEXT NOT NULL,
    table_name     TEXT,
    operation      TEXT,
    user_id        TEXT,
    metadata       TEXT NOT NULL DEFAULT '{}',
    created_at     TEXT NOT NULL
);

CREATE INDEX idx_chat_sessions_user ON chat_sessions(user_id);
CREATE INDEX idx_audit_log_event    ON audit_log(event_type);
CREATE INDEX idx_audit_log_created  ON audit_log(created_at);
"#;

/// V2: mirrored exchange activity.
const V2_TRADING: &str = r#"
CREATE TABLE user_portfolio (
    user_id      TEXT NOT NULL,
    symbol       TEXT NOT NULL,
    platform     TEXT NOT NULL,
    balance      REAL NOT NULL DEFAULT 0,
    value        REAL NOT NULL DEFAULT 0,
    last_updated TEXT NOT NULL,
    PRIMARY KEY (user_id, symbol, platform)
);

CREATE TABLE trades (
    id               TEXT PRIMARY KEY,
    user_id          TEXT NOT NULL,
    symbol           TEXT NOT NULL,
    side             TEXT NOT NULL,
    quantity         REAL NOT NULL,
    price            REAL NOT NULL DEFAULT 0,
    value            REAL NOT NULL DEFAULT 0,
    status           TEXT NOT NULL,
    is_paper_trade   INTEGER NOT NULL DEFAULT 0,
    trading_platform TEXT NOT NULL,
    created_at       TEXT NOT NULL
);

CREATE TABLE trade_history (
    id                TEXT PRIMARY KEY,
    user_id           TEXT NOT NULL,
    trade_id          TEXT REFERENCES trades(id) ON DELETE SET NULL,
    symbol            TEXT NOT NULL,
    amount            REAL NOT NULL,
    price             REAL NOT NULL DEFAULT 0,
    side              TEXT NOT NULL,
    status            TEXT NOT NULL,
    platform          TEXT NOT NULL,
    external_order_id TEXT,
    metadata          TEXT NOT NULL DEFAULT '{}',
    created_at        TEXT NOT NULL
);

CREATE INDEX idx_trades_user        ON trades(user_id, created_at);
CREATE INDEX idx_trade_history_user ON trade_history(user_id, created_at);
"#;

const MIGRATIONS: &[(i64, &str)] = &[(1, V1_INITIAL), (2, V2_TRADING)];

/// Run all pending migrations on `conn`.
///
/// Creates the `schema_migrations` tracking table if it does not exist,
/// then applies each outstanding migration inside a transaction.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    for &(version, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(e.to_string()))?;

        if already {
            continue;
        }

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute("INSERT INTO schema_migrations (version) VALUES (?1)", [version])
            .map_err(|e| Error::database(e.to_string()))?;

        tx.commit().map_err(|e| Error::database(e.to_string()))?;
    }

    Ok(())
}
