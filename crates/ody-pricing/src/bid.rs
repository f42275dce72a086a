//! Annual bid estimate for contract responses.

use serde::{Deserialize, Serialize};

/// Bid inputs. Every field is optional on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BidInputs {
    pub annual_hours: f64,
    /// Dollars per hour.
    pub labor_rate: f64,
    /// Annual materials in dollars.
    pub materials: f64,
    /// Fraction of the subtotal (0.15 = 15%).
    pub overhead_rate: f64,
    /// Fraction of subtotal plus overhead.
    pub profit_rate: f64,
}

impl Default for BidInputs {
    fn default() -> Self {
        Self {
            annual_hours: 2000.0,
            labor_rate: 25.0,
            materials: 5000.0,
            overhead_rate: 0.15,
            profit_rate: 0.10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BidEstimate {
    pub labor_costs: f64,
    pub material_costs: f64,
    pub overhead: f64,
    pub profit: f64,
    pub total_bid: f64,
    pub breakdown: String,
}

impl BidEstimate {
    pub fn compute(inputs: &BidInputs) -> Self {
        let labor_costs = cents(inputs.annual_hours * inputs.labor_rate);
        let material_costs = cents(inputs.materials);
        let subtotal = labor_costs + material_costs;
        let overhead = cents(subtotal * inputs.overhead_rate);
        let profit = cents((subtotal + overhead) * inputs.profit_rate);
        let total_bid = cents(subtotal + overhead + profit);

        let breakdown = format!(
            "Labor: ${} | Materials: ${} | Overhead: ${} | Profit: ${}",
            money(labor_costs),
            money(material_costs),
            money(overhead),
            money(profit),
        );

        Self {
            labor_costs,
            material_costs,
            overhead,
            profit,
            total_bid,
            breakdown,
        }
    }
}

fn cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// `1234.5` -> `1,234.50`; whole amounts drop the cents.
fn money(amount: f64) -> String {
    let total_cents = (amount * 100.0).round() as i64;
    let sign = if total_cents < 0 { "-" } else { "" };
    let abs = total_cents.unsigned_abs();
    let dollars = crate::format_dollars(abs / 100);
    match abs % 100 {
        0 => format!("{sign}{dollars}"),
        c => format!("{sign}{dollars}.{c:02}"),
    }
}
