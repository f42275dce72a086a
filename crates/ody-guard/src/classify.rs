//! Severity detection and the final process/reject decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::keywords::{APPROVED, BANNED, CRITICAL};

/// Maximum number of characters of the input kept in logs.
const PREVIEW_CHARS: usize = 200;

/// Returned to callers whose input was refused.
pub const REFUSAL_NOTICE: &str = "\
WEAPONIZATION ATTEMPT BLOCKED

This request was identified as an attempt to use ODYSSEY-1 for military,
combat, or weaponization purposes. It will not be processed.

ODYSSEY-1 builds medical technology that heals, educational tools that
teach, and accessibility features that empower. It does not build weapons,
combat technology, or tools for surveillance and harm.

The request has been logged. If this is an error, rephrase the request
with its medical or educational context.";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Risk level derived from the flagged terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Lowercase label, as stored in audit rows.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    fn recommendation(self) -> &'static str {
        match self {
            Severity::None => "Input is safe for processing",
            Severity::Low => {
                "MONITOR - Single weapon-related term detected. May be a false positive in medical or educational context."
            }
            Severity::Medium => {
                "CAUTION - Some weapon-related terms detected. Verify intent before processing."
            }
            Severity::High => {
                "REJECT - Multiple weapon-related terms detected. Request a reframe without military context."
            }
            Severity::Critical => {
                "REJECT IMMEDIATELY - Clear weaponization attempt. Log incident and alert admin."
            }
        }
    }
}

/// What the caller should do with the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Process,
    Reject,
    ManualReview,
}

/// Raw keyword scan result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    pub is_weaponized: bool,
    pub flagged_terms: Vec<String>,
    pub severity: Severity,
    pub recommendation: String,
}

/// Record of a refused or escalated input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub input: String,
    pub context: Option<String>,
    pub flagged_terms: Vec<String>,
    pub severity: Severity,
}

/// Final decision for an input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub approved: bool,
    pub reason: String,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_entry: Option<LogEntry>,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Scan `input` for banned terms and grade the result.
pub fn detect(input: &str) -> Detection {
    let lower = input.to_lowercase();
    let flagged_terms: Vec<String> = BANNED
        .iter()
        .filter(|term| lower.contains(*term))
        .map(|term| (*term).to_string())
        .collect();

    let severity = grade(&flagged_terms);

    Detection {
        is_weaponized: matches!(severity, Severity::High | Severity::Critical),
        recommendation: severity.recommendation().to_string(),
        flagged_terms,
        severity,
    }
}

fn grade(flagged: &[String]) -> Severity {
    if flagged.is_empty() {
        return Severity::None;
    }

    let has_critical = flagged
        .iter()
        .any(|term| CRITICAL.iter().any(|c| term.contains(c)));

    match flagged.len() {
        _ if has_critical => Severity::Critical,
        n if n >= 5 => Severity::Critical,
        n if n >= 3 => Severity::High,
        2 => Severity::Medium,
        _ => Severity::Low,
    }
}

/// True when the input carries a medical or educational context.
pub fn is_approved_context(input: &str) -> bool {
    let lower = input.to_lowercase();
    APPROVED.iter().any(|term| lower.contains(term))
}

/// Decide whether `input` may be processed.
///
/// `context` describes where the input came from (e.g. "chat") and is only
/// carried into the log entry.
pub fn check(input: &str, context: Option<&str>) -> Verdict {
    let detection = detect(input);

    let log_entry = || LogEntry {
        timestamp: Utc::now(),
        input: input.to_string(),
        context: context.map(String::from),
        flagged_terms: detection.flagged_terms.clone(),
        severity: detection.severity,
    };

    match detection.severity {
        Severity::Critical => Verdict {
            approved: false,
            reason: format!(
                "CRITICAL WEAPONIZATION DETECTED: {}",
                detection.recommendation
            ),
            action: Action::Reject,
            log_entry: Some(log_entry()),
        },
        Severity::High if is_approved_context(input) => Verdict {
            approved: true,
            reason: "Approved - medical/educational context overrides weapon keywords".into(),
            action: Action::Process,
            log_entry: None,
        },
        Severity::High => Verdict {
            approved: false,
            reason: format!("HIGH WEAPONIZATION RISK: {}", detection.recommendation),
            action: Action::Reject,
            log_entry: Some(log_entry()),
        },
        Severity::Medium => Verdict {
            approved: false,
            reason: format!("MANUAL REVIEW REQUIRED: {}", detection.recommendation),
            action: Action::ManualReview,
            log_entry: Some(log_entry()),
        },
        Severity::Low | Severity::None => Verdict {
            approved: true,
            reason: "Input passed anti-weaponization checks".into(),
            action: Action::Process,
            log_entry: None,
        },
    }
}

/// The first 200 characters of `input`, for logging.
pub fn preview(input: &str) -> String {
    input.chars().take(PREVIEW_CHARS).collect()
}
