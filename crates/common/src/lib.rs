//! LitGraph Common Library
//!
//! Shared code for the LitGraph services including:
//! - Error types and HTTP error mapping
//! - Configuration management
//! - Metrics and observability helpers
//! - Redis-backed graph snapshot cache

pub mod cache;
pub mod config;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum identifiers per bulk catalog request (provider filter limit)
pub const MAX_FILTER_IDS: usize = 100;

/// Maximum catalog requests in flight at once
pub const MAX_PARALLEL_REQUESTS: usize = 10;

/// Page size used for citation-search and author-works requests
pub const CITING_PAGE_SIZE: usize = 200;
