//! Cleaning and reporting pipeline for product reviews.
//!
//! Merges a product catalog with review exports, cleans the result into an
//! analysis-ready table and derives brand, category, price and sentiment
//! reports from it.

pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod processor;
pub mod reporter;
pub mod storage;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{Pipeline, PipelineSummary, RunMode};
