//! Rust structs mapping to database tables.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row`. JSON columns are decoded on read.

use ody_core::{AuditEntryId, ChatSessionId, TradeHistoryId, TradeId, UserId};
use ody_raip::TrustLevel;
use rusqlite::types::Type;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
}

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s)
        .map(T::from)
        .map_err(|e| conversion_err(idx, e))
}

fn parse_opt_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<T>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|v| Uuid::parse_str(&v).map(T::from).map_err(|e| conversion_err(idx, e)))
        .transpose()
}

fn parse_json<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row,
    idx: usize,
) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    serde_json::from_str(&s).map_err(|e| conversion_err(idx, e))
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// One text part of a conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPart {
    pub text: String,
}

/// A conversation turn in the generation API's `contents` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub parts: Vec<ChatPart>,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::text("user", text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::text("model", text)
    }

    fn text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![ChatPart { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub id: ChatSessionId,
    pub user_id: UserId,
    pub history: Vec<ChatTurn>,
    pub created_at: String,
    pub updated_at: String,
}

impl ChatSession {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            user_id: parse_id(row, 1)?,
            history: parse_json(row, 2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Agent registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Agent {
    pub agent_id: String,
    pub agent_name: String,
    pub public_key: String,
    pub trust_level: TrustLevel,
    pub constitutional_hash: Option<String>,
    pub capabilities: Vec<String>,
    pub pending_challenge: Option<String>,
    pub challenge_expires_at: Option<String>,
    pub created_at: String,
    pub last_handshake_at: Option<String>,
}

impl Agent {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let level: String = row.get(3)?;
        let trust_level = TrustLevel::parse(&level).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                Type::Text,
                format!("unknown trust level: {level}").into(),
            )
        })?;
        Ok(Self {
            agent_id: row.get(0)?,
            agent_name: row.get(1)?,
            public_key: row.get(2)?,
            trust_level,
            constitutional_hash: row.get(4)?,
            capabilities: parse_json(row, 5)?,
            pending_challenge: row.get(6)?,
            challenge_expires_at: row.get(7)?,
            created_at: row.get(8)?,
            last_handshake_at: row.get(9)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Audit log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub id: AuditEntryId,
    pub event_type: String,
    pub event_category: String,
    pub severity: String,
    pub table_name: Option<String>,
    pub operation: Option<String>,
    pub user_id: Option<UserId>,
    pub metadata: serde_json::Value,
    pub created_at: String,
}

impl AuditEntry {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            event_type: row.get(1)?,
            event_category: row.get(2)?,
            severity: row.get(3)?,
            table_name: row.get(4)?,
            operation: row.get(5)?,
            user_id: parse_opt_id(row, 6)?,
            metadata: parse_json(row, 7)?,
            created_at: row.get(8)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Portfolio
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Holding {
    pub user_id: UserId,
    pub symbol: String,
    pub platform: String,
    pub balance: f64,
    /// USD value at `last_updated`.
    pub value: f64,
    pub last_updated: String,
}

impl Holding {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: parse_id(row, 0)?,
            symbol: row.get(1)?,
            platform: row.get(2)?,
            balance: row.get(3)?,
            value: row.get(4)?,
            last_updated: row.get(5)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct Trade {
    pub id: TradeId,
    pub user_id: UserId,
    pub symbol: String,
    pub side: String,
    pub quantity: f64,
    pub price: f64,
    pub value: f64,
    pub status: String,
    pub is_paper_trade: bool,
    pub trading_platform: String,
    pub created_at: String,
}

impl Trade {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            user_id: parse_id(row, 1)?,
            symbol: row.get(2)?,
            side: row.get(3)?,
            quantity: row.get(4)?,
            price: row.get(5)?,
            value: row.get(6)?,
            status: row.get(7)?,
            is_paper_trade: row.get::<_, i32>(8)? != 0,
            trading_platform: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeHistoryEntry {
    pub id: TradeHistoryId,
    pub user_id: UserId,
    pub trade_id: Option<TradeId>,
    pub symbol: String,
    pub amount: f64,
    pub price: f64,
    pub side: String,
    pub status: String,
    pub platform: String,
    pub external_order_id: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: String,
}

impl TradeHistoryEntry {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            user_id: parse_id(row, 1)?,
            trade_id: parse_opt_id(row, 2)?,
            symbol: row.get(3)?,
            amount: row.get(4)?,
            price: row.get(5)?,
            side: row.get(6)?,
            status: row.get(7)?,
            platform: row.get(8)?,
            external_order_id: row.get(9)?,
            metadata: parse_json(row, 10)?,
            created_at: row.get(11)?,
        })
    }
}
