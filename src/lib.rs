// Core types and errors
pub mod core;

// Caching, upstream access and configuration
pub mod cache;
pub mod client;
pub mod config;

// Analytics engine
pub mod analytics;

pub mod util;

// Re-export commonly used types for convenience
pub use analytics::AnalyticsService;
pub use client::{DiseaseClient, StatsProvider};
pub use config::Config;
pub use crate::core::*;
