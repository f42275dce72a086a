use serde::{Deserialize, Serialize};

/// How far the gateway trusts a registered agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrustLevel {
    Untrusted,
    Verified,
    Trusted,
}

impl TrustLevel {
    /// One rung up the ladder. `Trusted` stays put.
    pub fn promote(self) -> Self {
        match self {
            Self::Untrusted => Self::Verified,
            Self::Verified | Self::Trusted => Self::Trusted,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Untrusted => "UNTRUSTED",
            Self::Verified => "VERIFIED",
            Self::Trusted => "TRUSTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UNTRUSTED" => Some(Self::Untrusted),
            "VERIFIED" => Some(Self::Verified),
            "TRUSTED" => Some(Self::Trusted),
            _ => None,
        }
    }
}

impl std::fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
