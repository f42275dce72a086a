//! Proposal prompt and the canned fallback proposal.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::Service;
use crate::quote::{format_dollars, Quote, QuoteRequest};

/// Name printed on generated and fallback proposals.
pub const COMPANY_NAME: &str = "ODYSSEY-1 Facility Services";

/// Inputs for a full proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRequest {
    pub client_name: String,
    #[serde(default)]
    pub client_type: String,
    #[serde(flatten)]
    pub quote: QuoteRequest,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub special_requirements: Option<String>,
}

impl ProposalRequest {
    fn requirements(&self) -> &str {
        self.special_requirements
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Standard commercial cleaning protocols")
    }

    fn service_names(&self, quote: &Quote) -> Vec<&'static str> {
        quote
            .line_items
            .iter()
            .filter_map(|item| Service::by_id(item.id).map(|s| s.name))
            .collect()
    }
}

/// Prompt sent to the text generator.
pub fn build_prompt(req: &ProposalRequest, quote: &Quote) -> String {
    let services = req
        .service_names(quote)
        .iter()
        .map(|name| format!("- {name}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Write a professional janitorial services proposal from {COMPANY_NAME}.\n\
         \n\
         Client: {client}\n\
         Client type: {client_type}\n\
         Facility size: {size} sq ft\n\
         Service frequency: {frequency}\n\
         Contract duration: {duration}\n\
         \n\
         Services:\n{services}\n\
         \n\
         Special requirements: {requirements}\n\
         \n\
         The monthly service fee is ${fee}. Do not change the price. Include a company \
         overview, the scope of work, quality assurance, and a closing statement that the \
         proposal is valid for 30 days. Respond with plain text only.",
        client = req.client_name,
        client_type = or_unspecified(&req.client_type),
        size = format_dollars(quote.facility_size),
        frequency = quote.frequency_label,
        duration = or_unspecified(&req.duration),
        requirements = req.requirements(),
        fee = format_dollars(quote.monthly_fee),
    )
}

/// Template proposal used when generation fails or returns nothing usable.
pub fn fallback_proposal(req: &ProposalRequest, quote: &Quote, date: NaiveDate) -> String {
    let services = req
        .service_names(quote)
        .iter()
        .map(|name| format!("  * {name}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "PROFESSIONAL JANITORIAL SERVICES PROPOSAL\n\
         \n\
         {COMPANY_NAME}\n\
         \n\
         Date: {date}\n\
         Prepared for: {client}\n\
         Client type: {client_type}\n\
         \n\
         PROPOSED SERVICES\n\
         {services}\n\
         \n\
         FACILITY SPECIFICATIONS\n\
         \x20 * Square footage: {size} sq ft\n\
         \x20 * Service frequency: {frequency}\n\
         \x20 * Contract duration: {duration}\n\
         \n\
         SPECIAL REQUIREMENTS\n\
         {requirements}\n\
         \n\
         PRICING\n\
         Monthly service fee: ${fee}\n\
         \n\
         This proposal is valid for 30 days. We look forward to serving your facility \
         maintenance needs.\n",
        date = date.format("%m/%d/%Y"),
        client = req.client_name,
        client_type = or_unspecified(&req.client_type),
        size = format_dollars(quote.facility_size),
        frequency = quote.frequency_label,
        duration = or_unspecified(&req.duration),
        requirements = req.requirements(),
        fee = format_dollars(quote.monthly_fee),
    )
}

/// Trimmed generated text, or `None` if nothing is left.
pub fn usable_generation(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn or_unspecified(value: &str) -> &str {
    let v = value.trim();
    if v.is_empty() {
        "Not specified"
    } else {
        v
    }
}
