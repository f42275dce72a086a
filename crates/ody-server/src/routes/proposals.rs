//! Janitorial quotes, generated proposals, and bid estimates.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use ody_pricing::{BidEstimate, BidInputs, ProposalRequest, Quote, QuoteRequest};
use serde::Serialize;

use crate::context::AppContext;
use crate::error::AppError;
use crate::gemini::GenerateRequest;
use crate::routes::parse_json;

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProposalResponse {
    #[schema(value_type = Object)]
    pub quote: Quote,
    pub proposal: String,
    /// False when the canned template was used.
    pub generated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

fn price(req: &QuoteRequest) -> Result<Quote, AppError> {
    ody_pricing::quote(req).map_err(|e| ody_core::Error::Validation(e.to_string()).into())
}

/// POST /api/proposals/quote
#[utoipa::path(
    post,
    path = "/api/proposals/quote",
    request_body(content = serde_json::Value, description = "facility_size, services, frequency"),
    responses(
        (status = 200, description = "Monthly fee and line items", body = serde_json::Value),
        (status = 400, description = "Invalid quote request")
    )
)]
pub async fn quote(body: Bytes) -> Result<Json<Quote>, AppError> {
    let req: QuoteRequest = parse_json(&body)?;
    Ok(Json(price(&req)?))
}

/// POST /api/proposals
#[utoipa::path(
    post,
    path = "/api/proposals",
    request_body(content = serde_json::Value, description = "Client details plus quote fields"),
    responses(
        (status = 200, description = "Quote and proposal text", body = ProposalResponse),
        (status = 400, description = "Invalid proposal request")
    )
)]
pub async fn create_proposal(
    State(ctx): State<AppContext>,
    body: Bytes,
) -> Result<Json<ProposalResponse>, AppError> {
    let req: ProposalRequest = parse_json(&body)?;
    if req.client_name.trim().is_empty() {
        return Err(ody_core::Error::Validation("client_name is required".into()).into());
    }
    let quote = price(&req.quote)?;

    let generated = if ctx.gemini.is_configured() {
        let prompt = ody_pricing::build_prompt(&req, &quote);
        match ctx.gemini.generate(&GenerateRequest::prompt(prompt)).await {
            Ok(g) => match ody_pricing::usable_generation(&g.text) {
                Some(text) => Some((text.to_string(), g.model)),
                None => {
                    tracing::warn!("Generated proposal was blank; using fallback template");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Proposal generation failed; using fallback template");
                None
            }
        }
    } else {
        tracing::debug!("Generation API not configured; using fallback template");
        None
    };

    let response = match generated {
        Some((proposal, model)) => ProposalResponse {
            quote,
            proposal,
            generated: true,
            model: Some(model),
        },
        None => ProposalResponse {
            proposal: ody_pricing::fallback_proposal(&req, &quote, chrono::Utc::now().date_naive()),
            quote,
            generated: false,
            model: None,
        },
    };

    Ok(Json(response))
}

/// POST /api/proposals/bid-estimate
#[utoipa::path(
    post,
    path = "/api/proposals/bid-estimate",
    request_body(content = serde_json::Value, description = "annual_hours, labor_rate, materials, overhead_rate, profit_rate (all optional)"),
    responses(
        (status = 200, description = "Annual bid estimate", body = serde_json::Value),
        (status = 400, description = "Invalid JSON")
    )
)]
pub async fn bid_estimate(body: Bytes) -> Result<Json<BidEstimate>, AppError> {
    let inputs: BidInputs = if body.iter().all(u8::is_ascii_whitespace) {
        BidInputs::default()
    } else {
        parse_json(&body)?
    };
    Ok(Json(BidEstimate::compute(&inputs)))
}
