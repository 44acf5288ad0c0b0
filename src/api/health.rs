//! Health check endpoints for Kubernetes probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::api::types::Json;

use super::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Returns 200 whenever the process is serving
pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
        latency_ms: None,
    };

    (StatusCode::OK, Json(response))
}

/// Reports cache backing state and, with a server credential, upstream reachability
///
/// A degraded cache or unreachable upstream still answers 200; the gateway
/// keeps serving in both cases.
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let mut checks = vec![check_cache(&state)];

    if state.has_server_credential() {
        checks.push(check_upstream(&state).await);
    }

    let status = if checks.iter().all(|c| c.status == HealthStatus::Healthy) {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(checks),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    };

    (StatusCode::OK, Json(response))
}

/// Liveness probe
pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

fn check_cache(state: &AppState) -> HealthCheck {
    let backing = state.cache.backing();

    if state.cache.is_degraded() {
        HealthCheck {
            name: "cache".to_string(),
            status: HealthStatus::Degraded,
            message: Some(format!(
                "Durable backing unreachable at startup, using {} cache",
                backing
            )),
            latency_ms: None,
        }
    } else {
        HealthCheck {
            name: "cache".to_string(),
            status: HealthStatus::Healthy,
            message: Some(format!("Using {} cache", backing)),
            latency_ms: None,
        }
    }
}

async fn check_upstream(state: &AppState) -> HealthCheck {
    let start = Instant::now();

    let healthy = match state.gateway_for(None) {
        Ok(gateway) => gateway.health_check().await,
        Err(_) => false,
    };

    HealthCheck {
        name: "upstream".to_string(),
        status: if healthy {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        },
        message: (!healthy).then(|| "Upstream API did not accept the server credential".to_string()),
        latency_ms: Some(start.elapsed().as_millis() as u64),
    }
}
