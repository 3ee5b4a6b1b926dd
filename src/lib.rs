//! # Bookharvest
//!
//! Harvest book records from a paginated bibliographic search API into a
//! local catalog service.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (BookRecord, HarvestQuery, ISBN keys)
//! - [`api`]: External service clients behind trait seams (search + catalog)
//! - [`harvest`]: The fetch-accumulate-dedupe controller and batch backfill
//! - [`utils`]: HTTP client and other utilities
//! - [`config`]: Configuration management

pub mod api;
pub mod config;
pub mod harvest;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use api::{ApiError, CatalogApi, SearchApi};
pub use harvest::{BatchImportController, HarvestController};
pub use models::BookRecord;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
