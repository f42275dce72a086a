//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries all
//! sub-configs for the server, auth, the generation API, the exchange proxy,
//! and the handshake gateway. Every section defaults sensibly so a completely
//! empty `{}` file is valid. Secrets may also come from the environment via
//! [`Config::apply_env`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::{Error, UserId};

/// Environment variable holding the generation API key.
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
/// Environment variable holding the exchange API key.
pub const ENV_EXCHANGE_API_KEY: &str = "COINBASE_API_KEY";
/// Environment variable holding the exchange API secret.
pub const ENV_EXCHANGE_API_SECRET: &str = "COINBASE_API_SECRET";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub gemini: GeminiConfig,
    pub exchange: ExchangeConfig,
    pub raip: RaipConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Override secrets from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Override secrets using an arbitrary lookup function.
    ///
    /// Empty values are ignored so an exported-but-blank variable never wipes
    /// a key set in the file.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_GEMINI_API_KEY) {
            self.gemini.api_key = Some(v);
        }
        if let Some(v) = get(ENV_EXCHANGE_API_KEY) {
            self.exchange.api_key = Some(v);
        }
        if let Some(v) = get(ENV_EXCHANGE_API_SECRET) {
            self.exchange.api_secret = Some(v);
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.auth.enabled && self.auth.tokens.is_empty() {
            warnings.push("auth is enabled but no tokens are configured".into());
        }

        for (i, tok) in self.auth.tokens.iter().enumerate() {
            if tok.token.trim().is_empty() {
                warnings.push(format!("auth.tokens[{i}].token is empty"));
            }
        }

        if self.rate_limit.api_per_minute == 0 {
            warnings.push("rate_limit.api_per_minute is 0; falling back to 300".into());
        }

        if self.gemini.api_key.is_none() {
            warnings.push(format!(
                "gemini.api_key is not set (or {ENV_GEMINI_API_KEY}); chat will fail and proposals use the fallback template"
            ));
        }

        if self.gemini.max_attempts == 0 {
            warnings.push("gemini.max_attempts is 0; one attempt will still be made".into());
        }

        if self.exchange.api_key.is_some() != self.exchange.api_secret.is_some() {
            warnings.push("exchange.api_key and exchange.api_secret must be set together".into());
        }

        if self.raip.requests_per_minute == 0 {
            warnings.push("raip.requests_per_minute is 0; falling back to 5".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            db_path: PathBuf::from("./data/odyssey.db"),
        }
    }
}

/// Bearer-token authentication settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub enabled: bool,
    pub tokens: Vec<ApiToken>,
}

/// A static API token mapped to the user it authenticates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiToken {
    pub token: String,
    pub user_id: UserId,
}

/// Global API throttling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub api_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { api_per_minute: 300 }
    }
}

/// Generative-AI API settings shared by chat and proposal generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub max_attempts: u32,
    pub retry_base_ms: u64,
    pub system_instruction: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash-preview-09-2025".into(),
            base_url: "https://generativelanguage.googleapis.com".into(),
            max_attempts: 3,
            retry_base_ms: 1000,
            system_instruction: "You are the ODYSSEY-1 AI Homework Helper. Provide educational \
                assistance, summaries, and Q&A. Use the search tool to ground your answers in \
                current, factual information. Keep a supportive, academic, non-judgmental tone \
                and always cite your sources."
                .into(),
        }
    }
}

/// Cryptocurrency exchange API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub base_url: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            base_url: "https://api.coinbase.com".into(),
        }
    }
}

/// Handshake gateway limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaipConfig {
    pub requests_per_minute: u32,
    pub max_drift_ms: i64,
    pub challenge_ttl_secs: i64,
}

impl Default for RaipConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 5,
            max_drift_ms: 30_000,
            challenge_ttl_secs: 300,
        }
    }
}
