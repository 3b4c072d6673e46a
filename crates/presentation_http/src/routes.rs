//! Route definitions

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method},
    routing::{get, post},
};
use infrastructure::config::ServerConfig;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::{
    handlers,
    middleware::{
        RateLimiterConfig, RateLimiterLayer, RateLimiterState, RequestIdLayer,
        SecurityHeadersLayer,
    },
    state::AppState,
};

/// Build the full application: routes plus the HTTP middleware stack
///
/// Returns the rate limiter state so the caller can schedule its cleanup.
pub fn create_app(state: AppState, server: &ServerConfig) -> (Router, Arc<RateLimiterState>) {
    let rate_limiter = RateLimiterLayer::new(&RateLimiterConfig::from(server));
    let limiter_state = rate_limiter.state();

    let app = create_router(state)
        .layer(rate_limiter)
        .layer(RequestBodyLimitLayer::new(server.max_body_size_json_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&server.allowed_origins))
        .layer(SecurityHeadersLayer::new())
        .layer(RequestIdLayer::new());

    (app, limiter_state)
}

/// Any origin when none are configured, otherwise the listed ones
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health and status endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        // Transit resources (v1)
        .route("/v1/sptrans/linhas/{linha}", get(handlers::sptrans::search_lines))
        .route(
            "/v1/sptrans/linhas/{linha}/paradas",
            get(handlers::sptrans::line_stops),
        )
        .route(
            "/v1/sptrans/posicao/{linha}",
            get(handlers::sptrans::vehicle_positions),
        )
        .route(
            "/v1/sptrans/previsao/{parada}",
            get(handlers::sptrans::predictions),
        )
        // Route planning (v1)
        .route("/v1/maps/rota", get(handlers::maps::route))
        // Natural language and typed queries (v1)
        .route("/v1/query", post(handlers::query::query))
        .route("/v1/intent", post(handlers::query::dispatch_intent))
        .with_state(state)
}
