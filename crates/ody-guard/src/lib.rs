//! ody-guard: keyword-based content classifier.
//!
//! Screens free text for weaponization language before it reaches the
//! generation API. Classification is a pure, deterministic function of the
//! input: banned substrings are counted, the count (and the presence of any
//! critical term) is mapped onto a [`Severity`], and the severity plus an
//! approved medical/educational context decide the final [`Action`].

pub mod classify;
pub mod keywords;

pub use classify::{
    check, detect, is_approved_context, preview, Action, Detection, LogEntry, Severity, Verdict,
    REFUSAL_NOTICE,
};
