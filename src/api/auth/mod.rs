//! Authentication API endpoints
//!
//! Login exchanges an upstream token for a session JWT after checking it
//! against the upstream API.

use axum::{extract::State, routing::post, Router};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};

pub fn create_auth_router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/validate", post(validate))
        .route("/logout", post(logout))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Upstream API token
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user_id: String,
    pub expires_at: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let upstream_token = request.token.trim();

    if upstream_token.is_empty() {
        return Err(ApiError::bad_request("Token must not be empty").with_param("token"));
    }

    let gateway = state.gateway_for(Some(upstream_token))?;
    gateway.accounts().await?;

    let access_token = state.jwt_service.issue(upstream_token)?;
    let expires_at = Utc::now() + Duration::hours(state.jwt_service.expiration_hours() as i64);

    info!(user_id = gateway.scope(), "Session issued");

    Ok(Json(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
        user_id: gateway.scope().to_string(),
        expires_at: expires_at.to_rfc3339(),
    }))
}

/// POST /api/auth/validate
pub async fn validate(user: RequireUser) -> Json<ValidateResponse> {
    Json(ValidateResponse {
        valid: true,
        user_id: user.user_id().to_string(),
    })
}

/// POST /api/auth/logout
///
/// Sessions are stateless; the client discards the token.
pub async fn logout(_user: RequireUser) -> Json<LogoutResponse> {
    Json(LogoutResponse {
        message: "Logged out successfully".to_string(),
    })
}
