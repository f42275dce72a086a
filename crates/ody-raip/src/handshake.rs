//! Handshake request shape and stateless checks.

use serde::{Deserialize, Serialize};

use crate::RaipError;

/// The only protocol version the gateway speaks.
pub const PROTOCOL_VERSION: &str = "1.0.0";

/// Longest accepted agent id, in bytes.
pub const MAX_AGENT_ID_LEN: usize = 128;

/// A handshake or identity-response message from an agent.
///
/// The same shape serves both stages: an initial handshake omits
/// `constitutional_hash`, an identity response carries it together with the
/// echoed `challenge` and a `signature` over it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    #[serde(default)]
    pub agent_id: String,
    /// Hex-encoded Ed25519 verifying key.
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Sender clock, unix milliseconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constitutional_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    /// Hex-encoded Ed25519 signature over the challenge bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_ttl: Option<u64>,
}

/// Which half of the exchange a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Initial,
    IdentityResponse,
}

impl Handshake {
    pub fn stage(&self) -> Stage {
        match self.constitutional_hash.as_deref() {
            Some(h) if !h.is_empty() => Stage::IdentityResponse,
            _ => Stage::Initial,
        }
    }

    /// Field, length and version checks. Returns the sender timestamp.
    pub fn validate(&self) -> Result<i64, RaipError> {
        if self.agent_id.trim().is_empty()
            || self.public_key.trim().is_empty()
            || self.protocol_version.trim().is_empty()
        {
            return Err(RaipError::MissingFields);
        }
        if self.agent_id.len() > MAX_AGENT_ID_LEN {
            return Err(RaipError::AgentIdTooLong);
        }
        if self.protocol_version != PROTOCOL_VERSION {
            return Err(RaipError::UnsupportedVersion(self.protocol_version.clone()));
        }
        self.timestamp.ok_or(RaipError::MissingTimestamp)
    }
}

/// Reject when `|now_ms - timestamp_ms| > max_ms`.
pub fn check_drift(now_ms: i64, timestamp_ms: i64, max_ms: i64) -> Result<(), RaipError> {
    let drift_ms = now_ms.saturating_sub(timestamp_ms).saturating_abs();
    if drift_ms > max_ms {
        return Err(RaipError::TimestampDrift { drift_ms, max_ms });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Handshake {
        Handshake {
            agent_id: "agent-7".into(),
            public_key: "ab".repeat(32),
            protocol_version: PROTOCOL_VERSION.into(),
            timestamp: Some(1_700_000_000_000),
            ..Default::default()
        }
    }

    #[test]
    fn validate_ok() {
        assert_eq!(valid().validate(), Ok(1_700_000_000_000));
        assert_eq!(valid().stage(), Stage::Initial);
    }

    #[test]
    fn missing_fields() {
        let blankers: [fn(&mut Handshake); 3] = [
            |h| h.agent_id.clear(),
            |h| h.public_key = "  ".into(),
            |h| h.protocol_version.clear(),
        ];
        for f in blankers {
            let mut h = valid();
            f(&mut h);
            assert_eq!(h.validate(), Err(RaipError::MissingFields));
        }
    }

    #[test]
    fn oversized_agent_id() {
        let mut h = valid();
        h.agent_id = "a".repeat(MAX_AGENT_ID_LEN);
        assert!(h.validate().is_ok());
        h.agent_id.push('a');
        assert_eq!(h.validate(), Err(RaipError::AgentIdTooLong));
    }

    #[test]
    fn wrong_version() {
        let mut h = valid();
        h.protocol_version = "2.0.0".into();
        assert_eq!(h.validate(), Err(RaipError::UnsupportedVersion("2.0.0".into())));
    }

    #[test]
    fn missing_timestamp() {
        let mut h = valid();
        h.timestamp = None;
        assert_eq!(h.validate(), Err(RaipError::MissingTimestamp));
    }

    #[test]
    fn drift_boundaries() {
        let now = 1_700_000_000_000;
        assert!(check_drift(now, now, 30_000).is_ok());
        assert!(check_drift(now, now - 30_000, 30_000).is_ok());
        assert!(check_drift(now, now + 30_000, 30_000).is_ok());
        assert_eq!(
            check_drift(now, now - 30_001, 30_000),
            Err(RaipError::TimestampDrift { drift_ms: 30_001, max_ms: 30_000 })
        );
        assert!(check_drift(now, now + 45_000, 30_000).is_err());
        assert!(check_drift(now, i64::MIN, 30_000).is_err());
    }

    #[test]
    fn identity_response_stage() {
        let mut h = valid();
        h.constitutional_hash = Some(String::new());
        assert_eq!(h.stage(), Stage::Initial);
        h.constitutional_hash = Some("abc".into());
        assert_eq!(h.stage(), Stage::IdentityResponse);
    }

    #[test]
    fn deserializes_minimal_message() {
        let h: Handshake = serde_json::from_str(
            r#"{"agent_id":"a","public_key":"k","protocol_version":"1.0.0","timestamp":5}"#,
        )
        .unwrap();
        assert!(h.capabilities.is_empty());
        assert_eq!(h.timestamp, Some(5));
        assert!(h.signature.is_none());
    }
}
