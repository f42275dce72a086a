//! Monthly fee calculation.

use serde::{Deserialize, Serialize};

use crate::catalog::{Frequency, Service};
use crate::PricingError;

/// mills -> dollars (1000) times percent -> ratio (100).
const SCALE: u64 = 100_000;

/// Inputs to [`quote`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRequest {
    /// Facility size in square feet.
    pub facility_size: u64,
    /// Selected service ids (see [`crate::SERVICES`]).
    pub services: Vec<String>,
    /// Frequency value (see [`crate::FREQUENCIES`]).
    pub frequency: String,
}

/// One selected service and its share of the fee.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub id: &'static str,
    pub name: &'static str,
    pub rate: f64,
    pub amount: u64,
}

/// A priced request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub facility_size: u64,
    pub frequency: &'static str,
    pub frequency_label: &'static str,
    pub multiplier: f64,
    pub line_items: Vec<LineItem>,
    /// Whole dollars per month.
    pub monthly_fee: u64,
}

/// Price `req`: `round(size * sum(rates) * multiplier)` in whole dollars.
///
/// Line item amounts are rounded independently and may not add up to the
/// fee exactly; the fee is computed from the summed rate.
pub fn quote(req: &QuoteRequest) -> Result<Quote, PricingError> {
    if req.facility_size == 0 {
        return Err(PricingError::ZeroSize);
    }
    if req.services.is_empty() {
        return Err(PricingError::NoServices);
    }

    let frequency = Frequency::by_value(&req.frequency)
        .ok_or_else(|| PricingError::UnknownFrequency(req.frequency.clone()))?;

    let mut selected: Vec<&'static Service> = Vec::with_capacity(req.services.len());
    for id in &req.services {
        let service =
            Service::by_id(id).ok_or_else(|| PricingError::UnknownService(id.clone()))?;
        if !selected.iter().any(|s| s.id == service.id) {
            selected.push(service);
        }
    }

    let line_items = selected
        .iter()
        .map(|s| {
            Ok(LineItem {
                id: s.id,
                name: s.name,
                rate: s.rate(),
                amount: scaled_round(req.facility_size, s.rate_mills, frequency.multiplier_pct)?,
            })
        })
        .collect::<Result<Vec<_>, PricingError>>()?;

    let total_mills: u64 = selected.iter().map(|s| s.rate_mills).sum();
    let monthly_fee = scaled_round(req.facility_size, total_mills, frequency.multiplier_pct)?;

    Ok(Quote {
        facility_size: req.facility_size,
        frequency: frequency.value,
        frequency_label: frequency.label,
        multiplier: frequency.multiplier(),
        line_items,
        monthly_fee,
    })
}

/// `size * mills * pct / SCALE`, rounded half up.
fn scaled_round(size: u64, mills: u64, pct: u64) -> Result<u64, PricingError> {
    size.checked_mul(mills)
        .and_then(|v| v.checked_mul(pct))
        .and_then(|v| v.checked_add(SCALE / 2))
        .map(|v| v / SCALE)
        .ok_or(PricingError::Overflow)
}

/// Format whole dollars with thousands separators (`12345` -> `12,345`).
pub fn format_dollars(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
