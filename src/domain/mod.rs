//! Domain layer - core types and seams, free of transport and storage details

pub mod cache;
pub mod error;
pub mod finance;
pub mod upstream;

pub use error::DomainError;
pub use upstream::FetchError;
