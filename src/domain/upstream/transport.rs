use async_trait::async_trait;
use thiserror::Error;

use super::request::{UpstreamRequest, UpstreamResponse};

/// Transport-level failure, before any HTTP status is available
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    /// Connection, DNS or TLS failure
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Connection dropped while the request or response was in flight
    #[error("Request interrupted: {0}")]
    Interrupted(String),

    /// The request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Trait for sending calls to the upstream API (for mocking)
#[async_trait]
pub trait UpstreamTransport: Send + Sync + std::fmt::Debug {
    /// Sends a request, returning the raw response for any HTTP status
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError>;
}
