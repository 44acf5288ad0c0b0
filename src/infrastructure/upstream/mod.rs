//! Upstream infrastructure - HTTP transport and the caching gateway

mod gateway;
mod http_transport;

pub use gateway::{scope_for, FetchGateway, GatewayConfig};
pub use http_transport::{HttpTransport, DEFAULT_USER_AGENT};
