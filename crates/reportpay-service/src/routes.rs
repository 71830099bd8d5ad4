//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{auth, health, reports, users};
use crate::state::AppState;

/// Maximum concurrent requests for `/api` endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
/// - `POST /api/auth/register` - Register and receive a token
/// - `POST /api/auth/login` - Log in and receive a token
/// - `POST /api/mock/create-report` - Create an anonymous report (when mock routes are enabled)
///
/// ## Bearer token
/// - `POST /api/user/link-anonymous` - Claim anonymous reports
/// - `GET /api/user/reports` - List own reports
/// - `GET /api/user/balance` - Current balance
/// - `POST /api/reports/:report_id/purchase` - Purchase a report
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;
    let enable_mock_routes = state.config.enable_mock_routes;

    let state = Arc::new(state);

    let mut api_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/user/link-anonymous", post(users::link_anonymous))
        .route("/user/reports", get(users::list_reports))
        .route("/user/balance", get(users::get_balance))
        .route("/reports/:report_id/purchase", post(reports::purchase_report));

    if enable_mock_routes {
        api_routes = api_routes.route("/mock/create-report", post(reports::create_mock_report));
    }

    let api_routes = api_routes.layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
