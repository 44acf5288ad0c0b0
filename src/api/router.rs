use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use super::analytics;
use super::auth;
use super::cache;
use super::health;
use super::middleware::logging_middleware;
use super::organizze;
use super::state::AppState;

/// Create the full router with application state
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth::create_auth_router())
        .nest("/analytics", analytics::create_analytics_router())
        .nest("/cache", cache::create_cache_router())
        .merge(organizze::create_resource_router());

    Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .nest("/api", api)
        .with_state(state)
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
}
