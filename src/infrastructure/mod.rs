//! Infrastructure layer - cache backings, upstream access and services

pub mod auth;
pub mod cache;
pub mod logging;
pub mod services;
pub mod upstream;
