//! Organizze Gateway
//!
//! Authenticated, cached access to the Organizze financial API:
//! - Cache store over Redis with a process-local fallback
//! - Resilient fetch gateway with a classified error taxonomy
//! - Session tokens, passthrough reads and derived analytics over HTTP

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use infrastructure::{
    auth::JwtService,
    cache::CacheStore,
    upstream::HttpTransport,
};
use tracing::{info, warn};

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state from configuration
///
/// Selects the cache backing once; an unreachable durable backing leaves the
/// store on the local backing, flagged as degraded.
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let cache = CacheStore::connect(&config.cache_config()).await;
    info!(
        backing = %cache.backing(),
        degraded = cache.is_degraded(),
        default_ttl_secs = cache.default_ttl().as_secs(),
        "Cache store ready"
    );

    let transport = HttpTransport::new(&config.upstream.base_url, &config.upstream.user_agent)?;
    info!(base_url = %transport.base_url(), "Upstream transport ready");

    let gateway_config = config.gateway_config();
    if gateway_config.api_key.is_none() {
        info!("No server-level upstream API key configured; callers must log in");
    }

    if config.auth.jwt_secret == infrastructure::auth::JwtConfig::default().secret {
        warn!("Using the default JWT secret; set APP__AUTH__JWT_SECRET in production");
    }

    Ok(AppState::new(
        Arc::new(cache),
        Arc::new(transport),
        Arc::new(gateway_config),
        Arc::new(JwtService::new(config.jwt_config())),
    ))
}
