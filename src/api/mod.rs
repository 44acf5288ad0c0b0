//! API layer - HTTP endpoints and middleware

pub mod analytics;
pub mod auth;
pub mod cache;
pub mod health;
pub mod middleware;
pub mod organizze;
pub mod router;
pub mod state;
pub mod types;

pub use middleware::RequireUser;
pub use router::create_router;
pub use state::AppState;
