//! Orders placed through the exchange proxy.

use chrono::Utc;
use ody_core::{Error, Result, TradeHistoryId, TradeId, UserId};
use rusqlite::Connection;
use serde_json::Value;

use crate::models::{Trade, TradeHistoryEntry};

const TRADE_COLS: &str = "id, user_id, symbol, side, quantity, price, value, status, \
                          is_paper_trade, trading_platform, created_at";

const HISTORY_COLS: &str = "id, user_id, trade_id, symbol, amount, price, side, status, \
                            platform, external_order_id, metadata, created_at";

#[derive(Debug, Clone)]
pub struct NewTrade {
    pub user_id: UserId,
    pub symbol: String,
    pub side: String,
    pub quantity: f64,
    pub price: f64,
    pub status: String,
    pub platform: String,
}

#[derive(Debug, Clone)]
pub struct NewTradeHistory {
    pub user_id: UserId,
    pub trade_id: Option<TradeId>,
    pub symbol: String,
    pub amount: f64,
    pub price: f64,
    pub side: String,
    pub status: String,
    pub platform: String,
    pub external_order_id: Option<String>,
    pub metadata: Value,
}

/// Record a trade. `value` is derived as quantity times price.
pub fn insert_trade(conn: &Connection, t: &NewTrade) -> Result<Trade> {
    let id = TradeId::new();
    let now = Utc::now().to_rfc3339();
    conn.execute(
        &format!(
            "INSERT INTO trades ({TRADE_COLS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9, ?10)"
        ),
        rusqlite::params![
            id.to_string(),
            t.user_id.to_string(),
            t.symbol,
            t.side,
            t.quantity,
            t.price,
            t.quantity * t.price,
            t.status,
            t.platform,
            now,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    let q = format!("SELECT {TRADE_COLS} FROM trades WHERE id = ?1");
    conn.query_row(&q, [id.to_string()], Trade::from_row)
        .map_err(|e| Error::database(e.to_string()))
}

pub fn insert_history(conn: &Connection, h: &NewTradeHistory) -> Result<TradeHistoryEntry> {
    let id = TradeHistoryId::new();
    let now = Utc::now().to_rfc3339();
    conn.execute(
        &format!(
            "INSERT INTO trade_history ({HISTORY_COLS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ),
        rusqlite::params![
            id.to_string(),
            h.user_id.to_string(),
            h.trade_id.map(|t| t.to_string()),
            h.symbol,
            h.amount,
            h.price,
            h.side,
            h.status,
            h.platform,
            h.external_order_id,
            h.metadata.to_string(),
            now,
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    let q = format!("SELECT {HISTORY_COLS} FROM trade_history WHERE id = ?1");
    conn.query_row(&q, [id.to_string()], TradeHistoryEntry::from_row)
        .map_err(|e| Error::database(e.to_string()))
}

/// A user's trades, newest first.
pub fn list_trades(conn: &Connection, user_id: UserId, limit: i64) -> Result<Vec<Trade>> {
    let q = format!(
        "SELECT {TRADE_COLS} FROM trades WHERE user_id = ?1
         ORDER BY created_at DESC, rowid DESC LIMIT ?2"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(rusqlite::params![user_id.to_string(), limit], Trade::from_row)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(rows)
}

pub fn list_history(
    conn: &Connection,
    user_id: UserId,
    limit: i64,
) -> Result<Vec<TradeHistoryEntry>> {
    let q = format!(
        "SELECT {HISTORY_COLS} FROM trade_history WHERE user_id = ?1
         ORDER BY created_at DESC, rowid DESC LIMIT ?2"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map(
            rusqlite::params![user_id.to_string(), limit],
            TradeHistoryEntry::from_row,
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
    use serde_json::json;

    #[test]
    fn trade_and_history() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let user = UserId::new();

        let trade = insert_trade(
            &conn,
            &NewTrade {
                user_id: user,
                symbol: "BTC-USD".into(),
                side: "BUY".into(),
                quantity: 0.01,
                price: 60_000.0,
                status: "executed".into(),
                platform: "coinbase".into(),
            },
        )
        .unwrap();
        assert!((trade.value - 600.0).abs() < 1e-9);
        assert!(!trade.is_paper_trade);

        let h = insert_history(
            &conn,
            &NewTradeHistory {
                user_id: user,
                trade_id: Some(trade.id),
                symbol: "BTC-USD".into(),
                amount: 0.01,
                price: 60_000.0,
                side: "BUY".into(),
                status: "completed".into(),
                platform: "coinbase".into(),
                external_order_id: Some("ord-1".into()),
                metadata: json!({"order_configuration": {"market_market_ioc": {"quote_size": "10"}}}),
            },
        )
        .unwrap();
        assert_eq!(h.trade_id, Some(trade.id));

        assert_eq!(list_trades(&conn, user, 10).unwrap().len(), 1);
        let hist = list_history(&conn, user, 10).unwrap();
        assert_eq!(hist[0].external_order_id.as_deref(), Some("ord-1"));
        assert!(list_trades(&conn, UserId::new(), 10).unwrap().is_empty());
    }
}
