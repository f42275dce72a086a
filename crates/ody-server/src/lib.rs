//! ody-server: HTTP API for the odyssey service.
//!
//! Ties the domain crates together into a running server:
//!
//! - Axum-based HTTP API with bearer-token auth and rate limiting
//! - Agent handshake gateway (`/raip/handshake`)
//! - Chat relay and proposal generation backed by the generation API
//! - Signed exchange proxy with local mirroring of balances and orders
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod exchange;
pub mod gemini;
pub mod middleware;
pub mod router;
pub mod routes;

use std::net::SocketAddr;

use ody_core::config::Config;

use crate::context::AppContext;

/// Start the odyssey server.
///
/// Opens (and migrates) the database, builds the [`AppContext`], and serves
/// HTTP until a shutdown signal is received.
pub async fn start(config: Config) -> ody_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let db_path = &config.server.db_path;
    let existed = db_path.exists();
    let db_str = db_path.to_string_lossy();
    let db = ody_db::pool::init_pool(&db_str)?;
    if existed {
        tracing::info!("Database opened (existing) at {db_str}");
    } else {
        tracing::info!("Database created (new) at {db_str}");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| ody_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let ctx = AppContext::new(config, db);
    let limiter = ctx.raip_limiter.clone();
    let app = router::build_router(ctx);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ody_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Starting server on {addr}");

    let pruner =
        middleware::rate_limit::spawn_pruning(limiter, middleware::rate_limit::PRUNE_INTERVAL);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    pruner.abort();
    served?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
