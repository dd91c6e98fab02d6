//! Matrix Call Analytics
//!
//! Analytics and reporting pipeline for AI voice-call agents. Call records
//! and agent profiles are pulled from a [`store::RecordSource`], filtered to
//! a reporting window and turned into a [`analytics::Report`]: overview
//! totals, agent rankings, cost efficiency, quality bands, usage patterns,
//! call pattern clusters and recommendations.

pub mod analytics;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod utils;

pub use error::{Error, Result};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
