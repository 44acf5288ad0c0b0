//! Derived financial views

use axum::{
    extract::State,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, Query};
use crate::domain::finance::{FinancialSummary, TrendPoint};

const DEFAULT_MONTHS: u32 = 6;
const MAX_MONTHS: u32 = 24;

pub fn create_analytics_router() -> Router<AppState> {
    Router::new()
        .route("/summary", get(summary))
        .route("/trends", get(trends))
}

#[derive(Debug, Deserialize)]
pub struct TrendsParams {
    pub months: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct TrendsResponse {
    pub trends: Vec<TrendPoint>,
}

async fn summary(
    State(state): State<AppState>,
    user: RequireUser,
) -> Result<Json<FinancialSummary>, ApiError> {
    let analytics = state.analytics_for(user.upstream_token())?;
    Ok(Json(analytics.summary().await?))
}

async fn trends(
    State(state): State<AppState>,
    user: RequireUser,
    Query(params): Query<TrendsParams>,
) -> Result<Json<TrendsResponse>, ApiError> {
    let months = params.months.unwrap_or(DEFAULT_MONTHS);

    if months == 0 || months > MAX_MONTHS {
        return Err(ApiError::bad_request(format!(
            "months must be between 1 and {}",
            MAX_MONTHS
        ))
        .with_param("months"));
    }

    let analytics = state.analytics_for(user.upstream_token())?;

    Ok(Json(TrendsResponse {
        trends: analytics.trends(months).await?,
    }))
}
