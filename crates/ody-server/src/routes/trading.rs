//! Exchange proxy: signed brokerage calls plus local mirroring of balances
//! and orders.

use axum::body::Bytes;
use axum::extract::{Extension, Query, State};
use axum::Json;
use ody_core::UserId;
use ody_db::models::{Holding, Trade, TradeHistoryEntry};
use ody_db::queries::{portfolio, trades};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::context::AppContext;
use crate::exchange;
use crate::error::AppError;
use crate::exchange::decimal_field;
use crate::routes::{clamp_limit, parse_json};

const PLATFORM: &str = "coinbase";
const QUOTE_CURRENCY: &str = "USD";

#[derive(Deserialize, utoipa::ToSchema)]
pub struct TradingRequest {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: Value,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TradeListResponse {
    #[schema(value_type = Vec<Object>)]
    pub trades: Vec<Trade>,
    #[schema(value_type = Vec<Object>)]
    pub history: Vec<TradeHistoryEntry>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

/// POST /api/trading
#[utoipa::path(
    post,
    path = "/api/trading",
    request_body = TradingRequest,
    responses(
        (status = 200, description = "Action result", body = serde_json::Value),
        (status = 400, description = "Invalid or unknown action"),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "Exchange credentials not configured"),
        (status = 502, description = "Exchange API failed")
    )
)]
pub async fn trading(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let req: TradingRequest = parse_json(&body)?;

    if !ctx.exchange.is_configured() {
        return Err(
            ody_core::Error::Config("exchange API credentials are not configured".into()).into(),
        );
    }

    tracing::debug!(action = %req.action, %user_id, "Trading action");

    let result = match req.action.as_str() {
        "getAccounts" => get_accounts(&ctx, user_id).await?,
        "getProducts" => {
            let data = ctx.exchange.products().await?;
            json!({ "success": true, "products": list_or_empty(&data["products"]) })
        }
        "getPrice" => {
            let symbol = product_id(required_str(&req.payload, "symbol", "Symbol required")?)?;
            let data = ctx.exchange.product(&symbol).await?;
            let price = match &data["price"] {
                Value::Null => json!("0"),
                v => v.clone(),
            };
            json!({ "success": true, "price": price, "symbol": data["product_id"] })
        }
        "placeOrder" => place_order(&ctx, user_id, &req.payload).await?,
        "getOrders" => {
            let data = ctx.exchange.orders().await?;
            json!({ "success": true, "orders": list_or_empty(&data["orders"]) })
        }
        "cancelOrder" => {
            let order_id = required_str(&req.payload, "orderId", "Order ID required")?;
            let data = ctx.exchange.cancel_orders(&[order_id]).await?;
            json!({ "success": true, "data": data })
        }
        "" => return Err(ody_core::Error::Validation("action is required".into()).into()),
        other => {
            return Err(ody_core::Error::Validation(format!("Unknown action: {other}")).into())
        }
    };

    Ok(Json(result))
}

async fn get_accounts(ctx: &AppContext, user_id: UserId) -> Result<Value, AppError> {
    let data = ctx.exchange.accounts().await?;
    let accounts = list_or_empty(&data["accounts"]);

    let mut holdings = Vec::new();
    for account in accounts.as_array().into_iter().flatten() {
        let Some(currency) = account["currency"].as_str() else {
            continue;
        };
        let balance = decimal_field(&account["available_balance"]["value"]);
        let value = if currency == QUOTE_CURRENCY {
            balance
        } else if balance > 0.0 {
            let product = format!("{currency}-{QUOTE_CURRENCY}");
            ctx.exchange
                .spot_price(&product)
                .await
                .map(|price| balance * price)
                .unwrap_or(0.0)
        } else {
            0.0
        };
        holdings.push((currency.to_string(), balance, value));
    }

    let conn = ody_db::pool::get_conn(&ctx.db)?;
    for (currency, balance, value) in &holdings {
        portfolio::upsert_holding(&conn, user_id, currency, PLATFORM, *balance, *value)?;
    }
    tracing::info!(%user_id, accounts = holdings.len(), "Portfolio synced");

    Ok(json!({ "success": true, "accounts": accounts }))
}

/// Validated `placeOrder` payload.
#[derive(Debug, PartialEq)]
pub(crate) struct OrderInput {
    pub symbol: String,
    pub side: String,
    pub limit: bool,
    /// Amount exactly as the caller sent it (string form).
    pub amount: String,
    pub price: Option<String>,
}

/// Normalize a caller-supplied symbol to the exchange's `BASE-QUOTE` form.
fn product_id(symbol: &str) -> ody_core::Result<String> {
    let id = symbol.trim().to_ascii_uppercase();
    if !exchange::is_product_id(&id) {
        return Err(ody_core::Error::Validation(format!(
            "Invalid symbol: {}",
            symbol.trim()
        )));
    }
    Ok(id)
}

impl OrderInput {
    pub(crate) fn parse(payload: &Value) -> ody_core::Result<Self> {
        let symbol = payload["symbol"].as_str().map(str::trim).unwrap_or_default();
        let side = payload["side"].as_str().map(str::trim).unwrap_or_default();
        let amount = match decimal_text(&payload["amount"]) {
            Some(a) if !symbol.is_empty() && !side.is_empty() => a,
            _ => {
                return Err(ody_core::Error::Validation(
                    "Symbol, side, and amount are required".into(),
                ))
            }
        };

        let symbol = product_id(symbol)?;
        let limit = payload["orderType"].as_str() == Some("limit");
        let price = decimal_text(&payload["price"]);
        if limit && price.is_none() {
            return Err(ody_core::Error::Validation(
                "price is required for limit orders".into(),
            ));
        }

        Ok(Self {
            symbol,
            side: side.to_string(),
            limit,
            amount,
            price,
        })
    }

    pub(crate) fn order_configuration(&self) -> Value {
        match (&self.price, self.limit) {
            (Some(price), true) => json!({
                "limit_limit_gtc": { "base_size": self.amount, "limit_price": price }
            }),
            _ => json!({
                "market_market_ioc": { "quote_size": self.amount }
            }),
        }
    }

    fn amount_f64(&self) -> f64 {
        self.amount.parse().unwrap_or(0.0)
    }

    fn price_f64(&self) -> f64 {
        self.price
            .as_deref()
            .and_then(|p| p.parse().ok())
            .unwrap_or(0.0)
    }
}

async fn place_order(ctx: &AppContext, user_id: UserId, payload: &Value) -> Result<Value, AppError> {
    let input = OrderInput::parse(payload)?;
    let order_configuration = input.order_configuration();

    let order = json!({
        "client_order_id": uuid::Uuid::new_v4().to_string(),
        "product_id": input.symbol,
        "side": input.side.to_uppercase(),
        "order_configuration": order_configuration,
    });

    let data = ctx.exchange.place_order(&order).await?;
    let success = data["success"].as_bool().unwrap_or(false);
    let external_order_id = data["order_id"].as_str().map(String::from);

    let conn = ody_db::pool::get_conn(&ctx.db)?;
    let trade = trades::insert_trade(
        &conn,
        &trades::NewTrade {
            user_id,
            symbol: input.symbol.clone(),
            side: input.side.clone(),
            quantity: input.amount_f64(),
            price: input.price_f64(),
            status: if success { "executed" } else { "pending" }.into(),
            platform: PLATFORM.into(),
        },
    )
    .inspect_err(|e| tracing::error!(error = %e, "Failed to record trade"))
    .ok();

    trades::insert_history(
        &conn,
        &trades::NewTradeHistory {
            user_id,
            trade_id: trade.as_ref().map(|t| t.id),
            symbol: input.symbol.clone(),
            amount: input.amount_f64(),
            price: input.price_f64(),
            side: input.side.clone(),
            status: if success { "completed" } else { "pending" }.into(),
            platform: PLATFORM.into(),
            external_order_id: external_order_id.clone(),
            metadata: json!({ "order_configuration": order_configuration }),
        },
    )?;

    let message = if success {
        format!("Order placed: {} {} {}", input.side, input.amount, input.symbol)
    } else {
        "Order failed".to_string()
    };
    tracing::info!(%user_id, symbol = %input.symbol, success, "Order submitted");

    Ok(json!({
        "success": success,
        "orderId": external_order_id,
        "message": message,
        "data": data,
    }))
}

/// GET /api/trading/portfolio
#[utoipa::path(
    get,
    path = "/api/trading/portfolio",
    responses(
        (status = 200, description = "Mirrored balances for the caller", body = serde_json::Value)
    )
)]
pub async fn get_portfolio(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<Vec<Holding>>, AppError> {
    let conn = ody_db::pool::get_conn(&ctx.db)?;
    Ok(Json(portfolio::list_holdings(&conn, user_id)?))
}

/// GET /api/trading/trades
#[utoipa::path(
    get,
    path = "/api/trading/trades",
    params(("limit" = Option<i64>, Query, description = "Maximum rows of each kind")),
    responses(
        (status = 200, description = "Recorded trades and history", body = TradeListResponse)
    )
)]
pub async fn list_trades(
    State(ctx): State<AppContext>,
    Extension(user_id): Extension<UserId>,
    Query(params): Query<ListParams>,
) -> Result<Json<TradeListResponse>, AppError> {
    let limit = clamp_limit(params.limit);
    let conn = ody_db::pool::get_conn(&ctx.db)?;
    Ok(Json(TradeListResponse {
        trades: trades::list_trades(&conn, user_id, limit)?,
        history: trades::list_history(&conn, user_id, limit)?,
    }))
}

// ---------------------------------------------------------------------------
// Payload helpers
// ---------------------------------------------------------------------------

fn list_or_empty(v: &Value) -> Value {
    match v {
        Value::Array(_) => v.clone(),
        _ => json!([]),
    }
}

fn required_str<'a>(payload: &'a Value, field: &str, message: &str) -> ody_core::Result<&'a str> {
    payload[field]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ody_core::Error::Validation(message.into()))
}

/// A positive decimal sent as a JSON number or numeric string, in string form.
fn decimal_text(v: &Value) -> Option<String> {
    let text = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    match text.parse::<f64>() {
        Ok(n) if n.is_finite() && n > 0.0 => Some(text),
        _ => None,
    }
}
