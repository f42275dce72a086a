//! Exchange balances mirrored per user.

use chrono::Utc;
use ody_core::{Error, Result, UserId};
use rusqlite::Connection;

use crate::models::Holding;

const COLS: &str = "user_id, symbol, platform, balance, value, last_updated";

/// Insert or replace the balance for a (user, symbol, platform) triple.
pub fn upsert_holding(
    conn: &Connection,
    user_id: UserId,
    symbol: &str,
    platform: &str,
    balance: f64,
    value: f64,
) -> Result<Holding> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO user_portfolio (user_id, symbol, platform, balance, value, last_updated)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(user_id, symbol, platform) DO UPDATE SET
            balance = excluded.balance,
            value = excluded.value,
            last_updated = excluded.last_updated",
        rusqlite::params![user_id.to_string(), symbol, platform, balance, value, now],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    let q = format!(
        "SELECT {COLS} FROM user_portfolio WHERE user_id = ?1 AND symbol = ?2 AND platform = ?3"
    );
    conn.query_row(
        &q,
        rusqlite::params![user_id.to_string(), symbol, platform],
        Holding::from_row,
    )
    .map_err(|e| Error::database(e.to_string()))
}

pub fn list_holdings(conn: &Connection, user_id: UserId) -> Result<Vec<Holding>> {
    let q = format!(
        "SELECT {COLS} FROM user_portfolio WHERE user_id = ?1
         ORDER BY value DESC, symbol"
    );
    let mut stmt = conn.prepare(&q).map_err(|e| Error::database(e.to_string()))?;
    let rows = stmt
        .query_map([user_id.to_string()], Holding::from_row)
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
    fn upsert_replaces_balance() {
        let pool = init_memory_pool().unwrap();
        let conn = get_conn(&pool).unwrap();
        let user = UserId::new();

        upsert_holding(&conn, user, "BTC", "coinbase", 0.5, 30_000.0).unwrap();
        let h = upsert_holding(&conn, user, "BTC", "coinbase", 0.25, 15_000.0).unwrap();
        assert_eq!(h.balance, 0.25);

        upsert_holding(&conn, user, "USD", "coinbase", 100.0, 100.0).unwrap();
        let all = list_holdings(&conn, user).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].symbol, "BTC");
        assert!(list_holdings(&conn, UserId::new()).unwrap().is_empty());
    }
}
