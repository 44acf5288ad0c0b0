//! Application state for shared services

use std::sync::Arc;

use crate::domain::upstream::{FetchError, UpstreamTransport};
use crate::infrastructure::auth::JwtService;
use crate::infrastructure::cache::CacheStore;
use crate::infrastructure::services::AnalyticsService;
use crate::infrastructure::upstream::{FetchGateway, GatewayConfig};

/// Shared state; gateways are built per request for the caller's credential
#[derive(Debug, Clone)]
pub struct AppState {
    pub cache: Arc<CacheStore>,
    pub transport: Arc<dyn UpstreamTransport>,
    pub gateway_config: Arc<GatewayConfig>,
    pub jwt_service: Arc<JwtService>,
}

impl AppState {
    pub fn new(
        cache: Arc<CacheStore>,
        transport: Arc<dyn UpstreamTransport>,
        gateway_config: Arc<GatewayConfig>,
        jwt_service: Arc<JwtService>,
    ) -> Self {
        Self {
            cache,
            transport,
            gateway_config,
            jwt_service,
        }
    }

    /// Gateway bound to `credential`, or to the server-level key when `None`
    pub fn gateway_for(&self, credential: Option<&str>) -> Result<FetchGateway, FetchError> {
        FetchGateway::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.cache),
            Arc::clone(&self.gateway_config),
            credential,
        )
    }

    pub fn analytics_for(&self, credential: &str) -> Result<AnalyticsService, FetchError> {
        self.gateway_for(Some(credential)).map(AnalyticsService::new)
    }

    /// Whether a server-level upstream credential is configured
    pub fn has_server_credential(&self) -> bool {
        self.gateway_config.api_key.is_some()
    }
}
