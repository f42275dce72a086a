//! Challenge issuance and Ed25519 proof of key possession.

use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::RaipError;

pub const CHALLENGE_PREFIX: &str = "odyssey-raip-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub value: String,
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// `odyssey-raip-<unix ms>-<16 random hex digits>`, valid for `ttl_secs`.
pub fn issue_challenge(now: DateTime<Utc>, ttl_secs: i64) -> Challenge {
    let nonce: u64 = rand::random();
    Challenge {
        value: format!("{CHALLENGE_PREFIX}{}-{nonce:016x}", now.timestamp_millis()),
        expires_at: now + Duration::seconds(ttl_secs),
    }
}

/// Decode a hex-encoded Ed25519 verifying key.
pub fn parse_public_key(public_key_hex: &str) -> Result<VerifyingKey, RaipError> {
    let key_bytes: [u8; 32] = hex::decode(public_key_hex.trim())
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or(RaipError::InvalidPublicKey)?;
    VerifyingKey::from_bytes(&key_bytes).map_err(|_| RaipError::InvalidPublicKey)
}

/// Verify `signature_hex` as an Ed25519 signature by `public_key_hex` over
/// the UTF-8 bytes of `challenge`.
pub fn verify_signature(
    public_key_hex: &str,
    challenge: &str,
    signature_hex: &str,
) -> Result<(), RaipError> {
    let key = parse_public_key(public_key_hex)?;

    let sig_bytes: [u8; 64] = hex::decode(signature_hex.trim())
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or(RaipError::MalformedSignature)?;
    let signature = Signature::from_bytes(&sig_bytes);

    key.verify(challenge.as_bytes(), &signature)
        .map_err(|_| RaipError::BadSignature)
}
