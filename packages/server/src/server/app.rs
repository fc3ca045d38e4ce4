//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    middleware,
    routing::get,
    Router,
};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::RateLimitConfig;
use crate::domains::auth::JwtService;
use crate::domains::listings::{Aggregator, ListingStores};
use crate::kernel::BaseListingWriter;
use crate::server::middleware::jwt_auth_middleware;
use crate::server::routes::{
    get_property, health_handler, list_all_properties, list_tier_properties, update_property,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub stores: ListingStores,
    pub aggregator: Arc<Aggregator>,
    pub jwt_service: Arc<JwtService>,
    /// `None` disables forwarding of manual updates.
    pub upstream_writer: Option<Arc<dyn BaseListingWriter>>,
}

impl AppState {
    /// Aggregates over the stores in IDX, VOW, Sold order.
    pub fn new(
        stores: ListingStores,
        jwt_service: Arc<JwtService>,
        upstream_writer: Option<Arc<dyn BaseListingWriter>>,
    ) -> Self {
        let aggregator = Arc::new(Aggregator::new(stores.ordered()));
        Self {
            stores,
            aggregator,
            jwt_service,
            upstream_writer,
        }
    }
}

/// Routes, auth, CORS and tracing. No rate limiting, so it can be driven
/// directly with `oneshot` in tests.
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - allow any origin
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::PATCH])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    let jwt_service_for_middleware = state.jwt_service.clone();

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/properties", get(list_all_properties))
        .route("/api/properties/:tier", get(list_tier_properties))
        .route(
            "/api/properties/:tier/:listing_key",
            get(get_property).patch(update_property),
        )
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(move |req, next| {
            jwt_auth_middleware(jwt_service_for_middleware.clone(), req, next)
        })) // JWT authentication
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Upper bound on a single request, store I/O included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Production router: `build_router` plus per-IP rate limiting and a
/// request timeout.
///
/// Needs `into_make_service_with_connect_info::<SocketAddr>()` when served.
pub fn build_app(state: AppState, rate_limit: RateLimitConfig) -> Result<Router> {
    let rate_limit_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(rate_limit.per_second)
            .burst_size(rate_limit.burst_size)
            .use_headers()
            .finish()
            .context("Invalid rate limit configuration")?,
    );

    let rate_limit_layer = GovernorLayer {
        config: rate_limit_config,
    };

    Ok(build_router(state)
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(rate_limit_layer))
}
