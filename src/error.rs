//! Error types for the review pipeline.
//!
//! Only the coverage check is fatal to a run. Bad cell values are coerced to
//! missing by the cleaner and never surface here.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Failed to read directory entry: {0}")]
    Glob(#[from] glob::GlobError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Insufficient data: column '{column}' is {null_pct:.1}% null")]
    InsufficientData { column: String, null_pct: f64 },

    #[error("Required column '{column}' not found in {table}")]
    MissingColumn { column: String, table: String },

    #[error("No input files matching '{pattern}' in {dir}")]
    NoInputFiles { dir: PathBuf, pattern: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl PipelineError {
    pub fn missing_column(column: &str, table: &str) -> Self {
        Self::MissingColumn {
            column: column.to_string(),
            table: table.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
