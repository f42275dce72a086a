//! Agent registry operations used by the handshake endpoint.

use chrono::{DateTime, SecondsFormat, Utc};
use ody_core::{Error, Result};
use ody_raip::TrustLevel;
use rusqlite::Connection;

use crate::models::Agent;

/// Fixed-width UTC form so stored expiries compare correctly as text.
fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

const COLS: &str = "agent_id, agent_name, public_key, trust_level, constitutional_hash, \
                    capabilities, pending_challenge, challenge_expires_at, created_at, \
                    last_handshake_at";

pub fn get_agent(conn: &Connection, agent_id: &str) -> Result<Option<Agent>> {
    let q = format!("SELECT {COLS} FROM agent_registry WHERE agent_id = ?1");
    match conn.query_row(&q, [agent_id], Agent::from_row) {
        Ok(a) => Ok(Some(a)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Register a new agent as `UNTRUSTED`.
///
/// If the id is already taken (including by a concurrent first contact) the
/// existing row is returned unchanged; callers compare its key themselves.
pub fn register_agent(
    conn: &Connection,
    agent_id: &str,
    public_key: &str,
    capabilities: &[String],
) -> Result<Agent> {
    let now = timestamp(Utc::now());
    let caps = serde_json::to_string(capabilities).map_err(|e| Error::Internal(e.to_string()))?;

    conn.execute(
        "INSERT INTO agent_registry
            (agent_id, agent_name, public_key, trust_level, capabilities, created_at, last_handshake_at)
         VALUES (?1, ?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(agent_id) DO NOTHING",
        rusqlite::params![agent_id, public_key, TrustLevel::Untrusted.as_str(), caps, now],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    get_agent(conn, agent_id)?.ok_or_else(|| Error::not_found("agent", agent_id))
}

/// Record a handshake attempt from a known agent.
pub fn touch_handshake(conn: &Connection, agent_id: &str) -> Result<()> {
    let now = timestamp(Utc::now());
    conn.execute(
        "UPDATE agent_registry SET last_handshake_at = ?2 WHERE agent_id = ?1",
        rusqlite::params![agent_id, now],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Store the challenge the agent must sign next, replacing any earlier one.
pub fn set_challenge(
    conn: &Connection,
    agent_id: &str,
    challenge: &str,
    expires_at: DateTime<Utc>,
) -> Result<()> {
    let n = conn
        .execute(
            "UPDATE agent_registry
             SET pending_challenge = ?2, challenge_expires_at = ?3
             WHERE agent_id = ?1",
            rusqlite::params![agent_id, challenge, timestamp(expires_at)],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    if n == 0 {
        return Err(Error::not_found("agent", agent_id));
    }
    Ok(())
}

/// Consume `challenge` and apply a successful identity response: new trust
/// level, the verified hash, and the challenge cleared.
///
/// The update only matches while `challenge` is still pending and unexpired
/// at `now`, so a challenge can be consumed once. Returns `None` when it no
/// longer is.
pub fn record_verification(
    conn: &Connection,
    agent_id: &str,
    challenge: &str,
    now: DateTime<Utc>,
    trust_level: TrustLevel,
    constitutional_hash: &str,
) -> Result<Option<Agent>> {
    let now = timestamp(now);
    let n = conn
        .execute(
            "UPDATE agent_registry
             SET trust_level = ?2,
                 constitutional_hash = ?3,
                 pending_challenge = NULL,
                 challenge_expires_at = NULL,
                 last_handshake_at = ?4
             WHERE agent_id = ?1
               AND pending_challenge = ?5
               AND challenge_expires_at > ?4",
            rusqlite::params![agent_id, trust_level.as_str(), constitutional_hash, now, challenge],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    if n == 0 {
        return Ok(None);
    }
    get_agent(conn, agent_id)
}
