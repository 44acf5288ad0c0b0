//! Financial analytics derived from upstream data

use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use tracing::debug;

use crate::domain::finance::{monthly_trends, summarize, FinancialSummary, TrendPoint};
use crate::domain::upstream::{FetchError, TransactionQuery};
use crate::infrastructure::upstream::FetchGateway;

/// Transactions considered by the summary
const SUMMARY_TRANSACTIONS: u32 = 100;

/// Page size for the trends window
const TRENDS_PAGE_SIZE: u32 = 1000;

const DAYS_PER_MONTH: i64 = 30;

/// Analytics over a caller's upstream data
#[derive(Debug, Clone)]
pub struct AnalyticsService {
    gateway: FetchGateway,
}

impl AnalyticsService {
    pub fn new(gateway: FetchGateway) -> Self {
        Self { gateway }
    }

    /// Financial summary, cached under the caller's `summary` entry
    pub async fn summary(&self) -> Result<FinancialSummary, FetchError> {
        let gateway = &self.gateway;

        gateway
            .cached_derived("summary", move || async move {
                let query = TransactionQuery::default().with_per_page(SUMMARY_TRANSACTIONS);

                let (accounts, transactions, categories) = tokio::try_join!(
                    gateway.accounts(),
                    gateway.transactions(&query),
                    gateway.categories(),
                )?;

                debug!(scope = gateway.scope(), "Computing financial summary");
                Ok(summarize(&accounts, &transactions, &categories))
            })
            .await
    }

    /// Monthly income and expenses over the last `months` months
    pub async fn trends(&self, months: u32) -> Result<Vec<TrendPoint>, FetchError> {
        self.trends_until(months, Local::now().date_naive()).await
    }

    /// Monthly trends over the `months * 30` days ending at `end`
    pub async fn trends_until(
        &self,
        months: u32,
        end: NaiveDate,
    ) -> Result<Vec<TrendPoint>, FetchError> {
        let start = end - ChronoDuration::days(i64::from(months) * DAYS_PER_MONTH);
        let query = TransactionQuery::default()
            .with_per_page(TRENDS_PAGE_SIZE)
            .with_date_range(start, end);

        let transactions = self.gateway.transactions(&query).await?;

        Ok(monthly_trends(&transactions))
    }
}
