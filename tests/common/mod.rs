//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory (or temp-file) DB, a
//! config, and a full [`AppContext`]. The `with_server*` constructors start Axum on a random
//! port for HTTP-level testing. Upstream APIs are pointed at a `wiremock`
//! server by [`mock_config`].

#![allow(dead_code)]

use std::net::SocketAddr;

use ed25519_dalek::{Signer, SigningKey};
use ody_core::config::{ApiToken, Config};
use ody_core::UserId;
use ody_db::pool::{init_memory_pool, init_pool, DbPool};
use ody_server::context::AppContext;
use ody_server::router::build_router;
use serde_json::{json, Value};

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory database.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    _dir: Option<tempfile::TempDir>,
}

impl TestHarness {
    /// Create a new harness with default configuration and in-memory DB.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new harness with a custom configuration and in-memory DB.
    pub fn with_config(config: Config) -> Self {
        let db = init_memory_pool().expect("failed to create in-memory pool");
        let ctx = AppContext::new(config, db.clone());
        Self { ctx, db, _dir: None }
    }

    /// Create a harness backed by a WAL database file in a temp directory,
    /// for tests that race concurrent writers.
    pub fn on_disk(config: Config) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("odyssey.db");
        let db = init_pool(&path.to_string_lossy()).expect("failed to create file pool");
        let ctx = AppContext::new(config, db.clone());
        Self {
            ctx,
            db,
            _dir: Some(dir),
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::with_server_config(Config::default()).await
    }

    /// Start an Axum server with custom config on a random port.
    pub async fn with_server_config(config: Config) -> (Self, SocketAddr) {
        Self::with_config(config).serve().await
    }

    /// Start an Axum server over an on-disk database.
    pub async fn with_server_on_disk() -> (Self, SocketAddr) {
        Self::on_disk(Config::default()).serve().await
    }

    async fn serve(self) -> (Self, SocketAddr) {
        let harness = self;
        let app = build_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> ody_db::pool::PooledConnection {
        ody_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }

    /// Audit rows for one operation, newest first.
    pub fn audit_rows(&self, operation: &str) -> Vec<ody_db::models::AuditEntry> {
        ody_db::queries::audit::list_entries(&self.conn(), Some(operation), 100)
            .expect("failed to list audit entries")
    }
}

/// Config whose generation and exchange clients talk to `mock_uri`, with
/// retries fast enough for tests.
pub fn mock_config(mock_uri: &str) -> Config {
    let mut config = Config::default();
    config.gemini.api_key = Some("test-gemini-key".into());
    config.gemini.base_url = mock_uri.to_string();
    config.gemini.retry_base_ms = 1;
    config.exchange.api_key = Some("test-exchange-key".into());
    config.exchange.api_secret = Some("test-exchange-secret".into());
    config.exchange.base_url = mock_uri.to_string();
    config
}

/// Enable bearer auth with one token per user.
pub fn with_tokens(mut config: Config, tokens: &[(&str, UserId)]) -> Config {
    config.auth.enabled = true;
    config.auth.tokens = tokens
        .iter()
        .map(|(token, user_id)| ApiToken {
            token: (*token).to_string(),
            user_id: *user_id,
        })
        .collect();
    config
}

/// A successful generateContent response body.
pub fn gemini_reply(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "groundingMetadata": {
                "groundingChunks": [
                    { "web": { "uri": "https://example.org/a", "title": "Source A" } }
                ]
            }
        }]
    })
}

/// A test agent with a deterministic Ed25519 key.
pub struct TestAgent {
    pub agent_id: String,
    pub key: SigningKey,
}

impl TestAgent {
    pub fn new(agent_id: &str, seed: u8) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            key: SigningKey::from_bytes(&[seed; 32]),
        }
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.key.verifying_key().to_bytes())
    }

    pub fn sign_hex(&self, challenge: &str) -> String {
        hex::encode(self.key.sign(challenge.as_bytes()).to_bytes())
    }

    /// Body of an initial handshake stamped with the current time.
    pub fn initial(&self) -> Value {
        json!({
            "agent_id": self.agent_id,
            "public_key": self.public_key_hex(),
            "protocol_version": "1.0.0",
            "capabilities": ["chat", "audit"],
            "timestamp": chrono::Utc::now().timestamp_millis(),
        })
    }

    /// Body of a correctly signed identity response.
    pub fn identity(&self, challenge: &str, constitutional_hash: &str) -> Value {
        let mut body = self.initial();
        body["constitutional_hash"] = json!(constitutional_hash);
        body["challenge"] = json!(challenge);
        body["signature"] = json!(self.sign_hex(challenge));
        body["session_ttl"] = json!(3600);
        body
    }
}
