//! Classified upstream errors

use thiserror::Error;

/// Outcome classification for a failed upstream fetch
///
/// Every failed `fetch` reports exactly one of these kinds, independent of the
/// transport library that produced the underlying failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Credential rejected upstream; retrying with the same credential is pointless
    #[error("Upstream rejected the credential")]
    Unauthorized,

    /// Upstream rate limit hit; the caller may retry later
    #[error("Upstream rate limit exceeded")]
    RateLimited,

    #[error("Upstream call timed out")]
    Timeout,

    #[error("Upstream unreachable: {0}")]
    NetworkUnavailable(String),

    #[error("Upstream returned HTTP {0}")]
    UpstreamBadStatus(u16),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FetchError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Short machine-readable name, used in logs and API error codes
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::NetworkUnavailable(_) => "network_unavailable",
            Self::UpstreamBadStatus(_) => "upstream_bad_status",
            Self::Internal(_) => "internal",
        }
    }

    /// Classifies a non-success HTTP status
    pub fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Unauthorized,
            429 => Self::RateLimited,
            code => Self::UpstreamBadStatus(code),
        }
    }
}
