//! Authentication infrastructure module
//!
//! Session tokens issued at login and validated on every protected route.

mod jwt;

pub use jwt::{JwtConfig, JwtService, SessionClaims};
