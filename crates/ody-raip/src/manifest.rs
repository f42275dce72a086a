//! Governance manifest and its constitutional hash.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Governance declaration an agent must share with the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub ver: String,
    pub data_sovereignty: bool,
    pub audit_logging: bool,
    pub precision_math: String,
    pub governance_model: String,
    pub policy_nonce: String,
}

impl Manifest {
    /// The manifest this gateway operates under.
    pub fn gateway() -> Self {
        Self {
            ver: "1.0.0".into(),
            data_sovereignty: true,
            audit_logging: true,
            precision_math: "integer-cents".into(),
            governance_model: "constitutional-alignment-v1".into(),
            policy_nonce: "334dde0".into(),
        }
    }

    pub fn hash(&self) -> String {
        // A struct of strings and bools always serializes.
        let value = serde_json::to_value(self).unwrap_or(Value::Null);
        constitutional_hash(&value)
    }
}

/// Compact JSON with object keys sorted at every depth.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Lowercase hex SHA-256 of [`canonical_json`].
pub fn constitutional_hash(value: &Value) -> String {
    hex::encode(Sha256::digest(canonical_json(value).as_bytes()))
}
