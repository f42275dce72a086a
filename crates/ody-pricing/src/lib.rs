//! ody-pricing: janitorial proposal pricing and proposal text.
//!
//! - [`catalog`]: the fixed service catalog and frequency multipliers
//! - [`quote`]: monthly fee calculation
//! - [`proposal`]: generation prompt and the canned fallback proposal
//! - [`bid`]: labor/material/overhead/profit bid estimate

pub mod bid;
pub mod catalog;
pub mod proposal;
pub mod quote;

pub use bid::{BidEstimate, BidInputs};
pub use catalog::{Frequency, Service, FREQUENCIES, SERVICES};
pub use proposal::{build_prompt, fallback_proposal, usable_generation, ProposalRequest};
pub use quote::{format_dollars, quote, LineItem, Quote, QuoteRequest};

/// Reasons a quote request is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("facility size must be greater than zero")]
    ZeroSize,
    #[error("at least one service must be selected")]
    NoServices,
    #[error("unknown service: {0}")]
    UnknownService(String),
    #[error("unknown frequency: {0}")]
    UnknownFrequency(String),
    #[error("facility size is too large")]
    Overflow,
}
