//! ody-raip: agent-to-agent handshake protocol.
//!
//! An external agent proves it runs under the same governance manifest as
//! the gateway by presenting the manifest's constitutional hash, and proves
//! its identity by signing a gateway-issued challenge with the Ed25519 key it
//! registered on first contact.
//!
//! - [`manifest`]: governance manifest, canonical JSON, constitutional hash
//! - [`handshake`]: request shape, field validation, clock drift
//! - [`trust`]: the trust ladder
//! - [`challenge`]: challenge issuance and signature verification

pub mod challenge;
pub mod handshake;
pub mod manifest;
pub mod trust;

pub use challenge::{
    issue_challenge, parse_public_key, verify_signature, Challenge, CHALLENGE_PREFIX,
};
pub use handshake::{check_drift, Handshake, Stage, MAX_AGENT_ID_LEN, PROTOCOL_VERSION};
pub use manifest::{canonical_json, constitutional_hash, Manifest};
pub use trust::TrustLevel;

/// Protocol-level rejection reasons.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RaipError {
    #[error("Missing required fields: agent_id, public_key, protocol_version")]
    MissingFields,
    #[error("agent_id must be at most {MAX_AGENT_ID_LEN} bytes")]
    AgentIdTooLong,
    #[error("Missing required field: timestamp")]
    MissingTimestamp,
    #[error("Unsupported protocol version {0}. Expected {PROTOCOL_VERSION}")]
    UnsupportedVersion(String),
    #[error("Timestamp drift of {drift_ms}ms exceeds {max_ms}ms. Clock synchronization required.")]
    TimestampDrift { drift_ms: i64, max_ms: i64 },
    #[error("public key must be 32 bytes of hex")]
    InvalidPublicKey,
    #[error("signature must be 64 bytes of hex")]
    MalformedSignature,
    #[error("signature does not verify against the registered key")]
    BadSignature,
}

impl From<RaipError> for ody_core::Error {
    fn from(err: RaipError) -> Self {
        match err {
            RaipError::InvalidPublicKey | RaipError::MalformedSignature | RaipError::BadSignature => {
                ody_core::Error::Forbidden(err.to_string())
            }
            _ => ody_core::Error::Validation(err.to_string()),
        }
    }
}
