//! Application context shared by every request handler.

use std::sync::Arc;

use ody_core::config::Config;
use ody_db::pool::DbPool;
use ody_db::queries::audit::{self, NewAuditEntry};

use crate::exchange::ExchangeClient;
use crate::gemini::GeminiClient;
use crate::middleware::rate_limit::{create_keyed_limiter, create_limiter, KeyedLimiter, SharedLimiter};

/// Application context shared by all request handlers (via Axum state).
///
/// This is cheaply cloneable because it only holds `Arc`s.
#[derive(Clone)]
pub struct AppContext {
    /// Database connection pool.
    pub db: DbPool,
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    /// Generation API client used by chat and proposals.
    pub gemini: Arc<GeminiClient>,
    /// Signed exchange API client.
    pub exchange: Arc<ExchangeClient>,
    /// Global limiter for `/api` routes.
    pub api_limiter: SharedLimiter,
    /// Per-agent limiter for the handshake gateway.
    pub raip_limiter: KeyedLimiter,
}

impl AppContext {
    pub fn new(config: Config, db: DbPool) -> Self {
        let gemini = Arc::new(GeminiClient::new(config.gemini.clone()));
        let exchange = Arc::new(ExchangeClient::new(&config.exchange));
        let api_limiter = create_limiter(config.rate_limit.api_per_minute, 300);
        let raip_limiter = create_keyed_limiter(config.raip.requests_per_minute, 5);
        Self {
            db,
            config: Arc::new(config),
            gemini,
            exchange,
            api_limiter,
            raip_limiter,
        }
    }

    /// Write an audit row. Failures are logged, not returned.
    pub fn audit(&self, entry: NewAuditEntry) {
        let result = ody_db::pool::get_conn(&self.db)
            .and_then(|conn| audit::insert_entry(&conn, &entry));
        if let Err(e) = result {
            tracing::error!(
                event_type = %entry.event_type,
                error = %e,
                "Failed to write audit entry"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_writes_row() {
        let db = ody_db::pool::init_memory_pool().unwrap();
        let ctx = AppContext::new(Config::default(), db);
        ctx.audit(NewAuditEntry::security("TEST_EVENT", "info"));
        let conn = ody_db::pool::get_conn(&ctx.db).unwrap();
        let rows = audit::list_entries(&conn, Some("TEST_EVENT"), 10).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
