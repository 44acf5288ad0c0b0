//! Cache administration

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tracing::info;

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};

pub fn create_cache_router() -> Router<AppState> {
    Router::new()
        .route("/clear", post(clear_cache))
        .route("/status", get(cache_status))
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: bool,
    pub backing: String,
}

#[derive(Debug, Serialize)]
pub struct CacheStatusResponse {
    pub backing: String,
    pub degraded: bool,
    pub default_ttl_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<usize>,
}

/// POST /api/cache/clear
async fn clear_cache(
    State(state): State<AppState>,
    user: RequireUser,
) -> Result<Json<ClearResponse>, ApiError> {
    if !state.cache.clear().await {
        return Err(ApiError::unavailable("Cache backing could not be cleared"));
    }

    info!(user_id = user.user_id(), backing = %state.cache.backing(), "Cache cleared");

    Ok(Json(ClearResponse {
        cleared: true,
        backing: state.cache.backing().to_string(),
    }))
}

/// GET /api/cache/status
async fn cache_status(State(state): State<AppState>, _user: RequireUser) -> Json<CacheStatusResponse> {
    Json(CacheStatusResponse {
        backing: state.cache.backing().to_string(),
        degraded: state.cache.is_degraded(),
        default_ttl_secs: state.cache.default_ttl().as_secs(),
        entries: state.cache.entry_count().await,
    })
}
