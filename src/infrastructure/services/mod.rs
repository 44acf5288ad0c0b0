//! Infrastructure services

mod analytics_service;

pub use analytics_service::AnalyticsService;
