//! Upstream domain - call descriptors, transport seam and error taxonomy

mod error;
mod request;
mod transport;

pub use error::FetchError;
pub use request::{
    Method, QueryParams, Resource, TransactionQuery, UpstreamRequest, UpstreamResponse,
};
pub use transport::{TransportError, UpstreamTransport};

#[cfg(test)]
pub use transport::mock::MockTransport;
