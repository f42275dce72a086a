//! Axum router construction.
//!
//! Builds the full application router with all route groups and middleware
//! layers.

use axum::middleware;
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::context::AppContext;
use crate::middleware::auth::auth_middleware;
use crate::middleware::rate_limit::rate_limit_middleware;
use crate::middleware::request_id::request_id_middleware;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health_check,
        routes::handshake::handshake,
        routes::chat::chat,
        routes::chat::list_sessions,
        routes::chat::get_session,
        routes::trading::trading,
        routes::trading::get_portfolio,
        routes::trading::list_trades,
        routes::proposals::quote,
        routes::proposals::create_proposal,
        routes::proposals::bid_estimate,
        routes::guard::check_input,
        routes::admin::drop_policies,
        routes::admin::list_audit,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::handshake::ChallengeResponse,
        routes::handshake::VerifiedResponse,
        routes::chat::ChatRequest,
        routes::chat::ChatResponse,
        routes::chat::ChatSessionResponse,
        routes::trading::TradingRequest,
        routes::trading::TradeListResponse,
        routes::proposals::ProposalResponse,
        routes::guard::GuardCheckRequest,
        routes::guard::GuardCheckResponse,
        crate::gemini::Source,
    ))
)]
pub struct ApiDoc;

/// Build the complete Axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Protected API routes.
    let api = Router::new()
        // Chat
        .route("/chat", post(routes::chat::chat))
        .route("/chat/sessions", get(routes::chat::list_sessions))
        .route("/chat/sessions/{id}", get(routes::chat::get_session))
        // Trading
        .route("/trading", post(routes::trading::trading))
        .route("/trading/portfolio", get(routes::trading::get_portfolio))
        .route("/trading/trades", get(routes::trading::list_trades))
        // Proposals
        .route("/proposals", post(routes::proposals::create_proposal))
        .route("/proposals/quote", post(routes::proposals::quote))
        .route(
            "/proposals/bid-estimate",
            post(routes::proposals::bid_estimate),
        )
        // Guard
        .route("/guard/check", post(routes::guard::check_input))
        // Admin
        .route(
            "/admin/policies/drop.sql",
            get(routes::admin::drop_policies),
        )
        .route("/admin/audit", get(routes::admin::list_audit))
        // The last layer added runs first: throttle before resolving the caller.
        .layer(middleware::from_fn_with_state(ctx.clone(), auth_middleware))
        .layer(middleware::from_fn_with_state(
            ctx.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/raip/handshake", post(routes::handshake::handshake))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .nest("/api", api)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use ody_core::config::Config;
    use tower::ServiceExt;

    fn app(config: Config) -> Router {
        let db = ody_db::pool::init_memory_pool().unwrap();
        build_router(AppContext::new(config, db))
    }

    #[tokio::test]
    async fn health_is_public() {
        let mut config = Config::default();
        config.auth.enabled = true;
        let resp = app(config)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn api_requires_token_when_auth_enabled() {
        let mut config = Config::default();
        config.auth.enabled = true;
        let resp = app(config)
            .oneshot(
                Request::post("/api/proposals/bid-estimate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn openapi_document_lists_routes() {
        let resp = app(Config::default())
            .oneshot(
                Request::get("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(doc["paths"]["/raip/handshake"].is_object());
        assert!(doc["paths"]["/api/chat"].is_object());
    }

    #[tokio::test]
    async fn cors_preflight_on_handshake() {
        let resp = app(Config::default())
            .oneshot(
                Request::options("/raip/handshake")
                    .header("origin", "https://agent.example")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()["access-control-allow-origin"],
            "*"
        );
    }

    #[tokio::test]
    async fn api_rate_limit_applies() {
        let mut config = Config::default();
        config.rate_limit.api_per_minute = 1;
        let app = app(config);
        let send = || {
            app.clone().oneshot(
                Request::post("/api/proposals/bid-estimate")
                    .body(Body::empty())
                    .unwrap(),
            )
        };
        assert_eq!(send().await.unwrap().status(), StatusCode::OK);
        assert_eq!(send().await.unwrap().status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
