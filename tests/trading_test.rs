//! Exchange proxy integration tests against a mocked exchange.

mod common;

use common::{mock_config, TestHarness};
use ody_core::UserId;
use serde_json::{json, Value};
use std::net::SocketAddr;
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn trading(addr: SocketAddr, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/api/trading"))
        .json(&body)
        .send()
        .await
        .expect("request failed")
}

#[tokio::test]
async fn missing_credentials_is_a_server_error() {
    let (_harness, addr) = TestHarness::with_server().await;
    let resp = trading(addr, json!({ "action": "getProducts" })).await;
    assert_eq!(resp.status(), 500);
}

#[tokio::test]
async fn unknown_and_missing_actions_rejected() {
    let mock = MockServer::start().await;
    let (_harness, addr) = TestHarness::with_server_config(mock_config(&mock.uri())).await;

    let resp = trading(addr, json!({ "action": "launchRocket" })).await;
    assert_eq!(resp.status(), 400);
    let json: Value = resp.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("Unknown action: launchRocket"));

    let resp = trading(addr, json!({ "payload": {} })).await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn get_accounts_signs_request_and_mirrors_balances() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/brokerage/accounts"))
        .and(header_exists("CB-ACCESS-KEY"))
        .and(header_exists("CB-ACCESS-SIGN"))
        .and(header_exists("CB-ACCESS-TIMESTAMP"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accounts": [
                { "currency": "USD", "available_balance": { "value": "150.50", "currency": "USD" } },
                { "currency": "BTC", "available_balance": { "value": "0.5", "currency": "BTC" } },
                { "currency": "ETH", "available_balance": { "value": "0", "currency": "ETH" } }
            ]
        })))
        .expect(1)
        .mount(&mock)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/brokerage/products/BTC-USD"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "product_id": "BTC-USD", "price": "60000" })),
        )
        .expect(1)
        .mount(&mock)
        .await;

    let (harness, addr) = TestHarness::with_server_config(mock_config(&mock.uri())).await;
    let resp = trading(addr, json!({ "action": "getAccounts" })).await;
    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["accounts"].as_array().unwrap().len(), 3);

    // The signature covers timestamp + method + path + body.
    let requests = mock.received_requests().await.unwrap();
    let accounts_req = requests
        .iter()
        .find(|r| r.url.path() == "/api/v3/brokerage/accounts")
        .unwrap();
    let ts = accounts_req.headers.get("CB-ACCESS-TIMESTAMP").unwrap().to_str().unwrap();
    let expected = ody_server::exchange::sign(
        "test-exchange-secret",
        ts,
        "GET",
        "/api/v3/brokerage/accounts",
        "",
    )
    .unwrap();
    assert_eq!(
        accounts_req.headers.get("CB-ACCESS-SIGN").unwrap().to_str().unwrap(),
        expected
    );

    let holdings =
        ody_db::queries::portfolio::list_holdings(&harness.conn(), UserId::anonymous()).unwrap();
    let by_symbol = |s: &str| holdings.iter().find(|h| h.symbol == s).unwrap().clone();
    assert_eq!(holdings.len(), 3);
    assert!((by_symbol("USD").value - 150.5).abs() < 1e-9);
    assert!((by_symbol("BTC").value - 30_000.0).abs() < 1e-6);
    assert_eq!(by_symbol("ETH").value, 0.0);
    assert_eq!(by_symbol("BTC").platform, "coinbase");

    let resp = reqwest::get(format!("http://{addr}/api/trading/portfolio")).await.unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn get_price_requires_symbol() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/brokerage/products/ETH-USD"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "product_id": "ETH-USD", "price": "3100.25" })),
        )
        .mount(&mock)
        .await;
    let (_harness, addr) = TestHarness::with_server_config(mock_config(&mock.uri())).await;

    let resp = trading(addr, json!({ "action": "getPrice", "payload": {} })).await;
    assert_eq!(resp.status(), 400);

    let resp = trading(
        addr,
        json!({ "action": "getPrice", "payload": { "symbol": "ETH-USD" } }),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["price"], "3100.25");
    assert_eq!(json["symbol"], "ETH-USD");
}

#[tokio::test]
async fn get_price_rejects_malformed_symbol() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accounts": [] })))
        .expect(0)
        .mount(&mock)
        .await;
    let (_harness, addr) = TestHarness::with_server_config(mock_config(&mock.uri())).await;

    for symbol in ["../accounts", "BTC-USD/../../accounts", "BTC-USD?limit=1", "BTCUSD"] {
        let resp = trading(
            addr,
            json!({ "action": "getPrice", "payload": { "symbol": symbol } }),
        )
        .await;
        assert_eq!(resp.status(), 400, "{symbol}");
        let json: Value = resp.json().await.unwrap();
        assert!(json["error"].as_str().unwrap().contains("Invalid symbol"));
    }
}

#[tokio::test]
async fn get_orders_returns_order_list() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/brokerage/orders/historical/batch"))
        .and(header_exists("CB-ACCESS-SIGN"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orders": [
                { "order_id": "ord-1", "product_id": "BTC-USD", "status": "FILLED" },
                { "order_id": "ord-2", "product_id": "ETH-USD", "status": "OPEN" }
            ],
            "has_next": false
        })))
        .expect(1)
        .mount(&mock)
        .await;

    let (_harness, addr) = TestHarness::with_server_config(mock_config(&mock.uri())).await;
    let resp = trading(addr, json!({ "action": "getOrders" })).await;
    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["success"], true);
    let orders = json["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0]["order_id"], "ord-1");
    assert_eq!(orders[1]["status"], "OPEN");
}

#[tokio::test]
async fn get_orders_without_list_is_empty() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/brokerage/orders/historical/batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "has_next": false })))
        .mount(&mock)
        .await;

    let (_harness, addr) = TestHarness::with_server_config(mock_config(&mock.uri())).await;
    let resp = trading(addr, json!({ "action": "getOrders" })).await;
    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["orders"], json!([]));
}

#[tokio::test]
async fn place_order_records_trade_and_history() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/brokerage/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "order_id": "ord-123",
        })))
        .expect(1)
        .mount(&mock)
        .await;

    let (harness, addr) = TestHarness::with_server_config(mock_config(&mock.uri())).await;
    let resp = trading(
        addr,
        json!({
            "action": "placeOrder",
            "payload": { "symbol": "BTC-USD", "side": "buy", "amount": 25 }
        }),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["orderId"], "ord-123");
    assert_eq!(json["message"], "Order placed: buy 25 BTC-USD");

    let requests = mock.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["side"], "BUY");
    assert_eq!(sent["product_id"], "BTC-USD");
    assert_eq!(
        sent["order_configuration"],
        json!({ "market_market_ioc": { "quote_size": "25" } })
    );
    assert!(sent["client_order_id"].as_str().unwrap().parse::<uuid::Uuid>().is_ok());

    let resp = reqwest::get(format!("http://{addr}/api/trading/trades")).await.unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["trades"][0]["status"], "executed");
    assert_eq!(json["history"][0]["status"], "completed");
    assert_eq!(json["history"][0]["external_order_id"], "ord-123");

    let trades =
        ody_db::queries::trades::list_trades(&harness.conn(), UserId::anonymous(), 10).unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].trading_platform, "coinbase");
}

#[tokio::test]
async fn rejected_order_is_recorded_as_pending() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/brokerage/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error_response": { "error": "INSUFFICIENT_FUND" }
        })))
        .mount(&mock)
        .await;

    let (_harness, addr) = TestHarness::with_server_config(mock_config(&mock.uri())).await;
    let resp = trading(
        addr,
        json!({
            "action": "placeOrder",
            "payload": {
                "symbol": "ETH-USD", "side": "sell", "amount": "0.5",
                "orderType": "limit", "price": "3100.25"
            }
        }),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Order failed");

    let resp = reqwest::get(format!("http://{addr}/api/trading/trades")).await.unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["trades"][0]["status"], "pending");
    assert_eq!(json["history"][0]["status"], "pending");
    assert_eq!(
        json["history"][0]["metadata"]["order_configuration"]["limit_limit_gtc"]["limit_price"],
        "3100.25"
    );
}

#[tokio::test]
async fn invalid_order_never_reaches_exchange() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock)
        .await;

    let (_harness, addr) = TestHarness::with_server_config(mock_config(&mock.uri())).await;
    let resp = trading(
        addr,
        json!({ "action": "placeOrder", "payload": { "symbol": "BTC-USD", "side": "buy" } }),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let json: Value = resp.json().await.unwrap();
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("Symbol, side, and amount are required"));
}

#[tokio::test]
async fn exchange_error_is_bad_gateway() {
    let mock = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/brokerage/products"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&mock)
        .await;

    let (_harness, addr) = TestHarness::with_server_config(mock_config(&mock.uri())).await;
    let resp = trading(addr, json!({ "action": "getProducts" })).await;
    assert_eq!(resp.status(), 502);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["upstream_status"], 401);
}

#[tokio::test]
async fn cancel_order_requires_id() {
    let mock = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v3/brokerage/orders/batch_cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{ "success": true, "order_id": "ord-9" }]
        })))
        .expect(1)
        .mount(&mock)
        .await;

    let (_harness, addr) = TestHarness::with_server_config(mock_config(&mock.uri())).await;
    let resp = trading(addr, json!({ "action": "cancelOrder", "payload": {} })).await;
    assert_eq!(resp.status(), 400);

    let resp = trading(
        addr,
        json!({ "action": "cancelOrder", "payload": { "orderId": "ord-9" } }),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let requests = mock.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["order_ids"], json!(["ord-9"]));
}
