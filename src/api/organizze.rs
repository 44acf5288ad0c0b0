//! Authenticated passthrough reads of upstream resources

use axum::{
    extract::State,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, Query};
use crate::domain::upstream::TransactionQuery;

const MAX_PER_PAGE: u32 = 1000;

pub fn create_resource_router() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts))
        .route("/transactions", get(list_transactions))
        .route("/categories", get(list_categories))
        .route("/budgets", get(list_budgets))
}

#[derive(Debug, Default, Deserialize)]
pub struct TransactionParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TransactionParams {
    fn into_query(self) -> Result<TransactionQuery, ApiError> {
        let mut query = TransactionQuery::default();

        if let Some(page) = self.page {
            if page == 0 {
                return Err(ApiError::bad_request("page must be at least 1").with_param("page"));
            }
            query = query.with_page(page);
        }

        if let Some(per_page) = self.per_page {
            if per_page == 0 || per_page > MAX_PER_PAGE {
                return Err(ApiError::bad_request(format!(
                    "per_page must be between 1 and {}",
                    MAX_PER_PAGE
                ))
                .with_param("per_page"));
            }
            query = query.with_per_page(per_page);
        }

        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(ApiError::bad_request("start_date must not be after end_date")
                    .with_param("start_date"));
            }
        }

        query.start_date = self.start_date;
        query.end_date = self.end_date;

        Ok(query)
    }
}

async fn list_accounts(
    State(state): State<AppState>,
    user: RequireUser,
) -> Result<Json<Value>, ApiError> {
    let gateway = state.gateway_for(Some(user.upstream_token()))?;
    Ok(Json(gateway.accounts().await?))
}

async fn list_transactions(
    State(state): State<AppState>,
    user: RequireUser,
    Query(params): Query<TransactionParams>,
) -> Result<Json<Value>, ApiError> {
    let query = params.into_query()?;
    let gateway = state.gateway_for(Some(user.upstream_token()))?;
    Ok(Json(gateway.transactions(&query).await?))
}

async fn list_categories(
    State(state): State<AppState>,
    user: RequireUser,
) -> Result<Json<Value>, ApiError> {
    let gateway = state.gateway_for(Some(user.upstream_token()))?;
    Ok(Json(gateway.categories().await?))
}

async fn list_budgets(
    State(state): State<AppState>,
    user: RequireUser,
) -> Result<Json<Value>, ApiError> {
    let gateway = state.gateway_for(Some(user.upstream_token()))?;
    Ok(Json(gateway.budgets().await?))
}
