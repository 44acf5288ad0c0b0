//! Upstream call descriptors

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use chrono::NaiveDate;

/// HTTP method of an upstream call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Only idempotent reads are served from and written to the cache
    pub fn is_cacheable(&self) -> bool {
        matches!(self, Method::Get)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query parameters, kept sorted by name so equal sets render identically
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.0.insert(name.into(), value.to_string());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) {
        self.0.insert(name.into(), value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonical `name=value&name=value` rendering used in cache keys
    ///
    /// Parameters are ordered by name, and `%`, `&` and `=` inside names or
    /// values are percent-encoded so distinct parameter sets never collide.
    pub fn canonical(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn encode_component(raw: &str) -> String {
    raw.replace('%', "%25")
        .replace('&', "%26")
        .replace('=', "%3D")
}

/// Resources exposed by the upstream API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Accounts,
    Transactions,
    Categories,
    Budgets,
}

impl Resource {
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Accounts => "/accounts",
            Resource::Transactions => "/transactions",
            Resource::Categories => "/categories",
            Resource::Budgets => "/budgets",
        }
    }
}

/// Pagination and date window for the transactions resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionQuery {
    pub page: u32,
    pub per_page: u32,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Default for TransactionQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 50,
            start_date: None,
            end_date: None,
        }
    }
}

impl TransactionQuery {
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn to_params(&self) -> QueryParams {
        let mut params = QueryParams::new()
            .with("page", self.page)
            .with("per_page", self.per_page);

        if let Some(start) = self.start_date {
            params.insert("start_date", start.format("%Y-%m-%d"));
        }
        if let Some(end) = self.end_date {
            params.insert("end_date", end.format("%Y-%m-%d"));
        }

        params
    }
}

/// A single outbound call to the upstream API
#[derive(Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub path: String,
    pub params: QueryParams,
    /// Value of the `Authorization` header
    pub authorization: String,
    pub timeout: Duration,
}

impl fmt::Debug for UpstreamRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamRequest")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("params", &self.params)
            .field("authorization", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Raw upstream response
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
