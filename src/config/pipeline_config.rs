use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{PipelineError, Result};
use crate::models::columns;

pub const DATA_DIR_ENV: &str = "REVIEW_DATA_DIR";
pub const OUTPUT_DIR_ENV: &str = "REVIEW_OUTPUT_DIR";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub cleaning: CleaningConfig,
    pub reporting: ReportingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub products_file: String,
    /// Review parts are every `<prefix>*.csv` file in the data directory.
    pub reviews_prefix: String,
}

/// What to do with rows at or above the price percentile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierPolicy {
    /// Count and log outliers but keep them in the cleaned table.
    #[default]
    Report,
    /// Remove outliers from the cleaned table.
    Drop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub required_columns: Vec<String>,
    /// A required column with a (truncated) null percentage above this aborts the run.
    pub max_null_pct: f64,
    pub min_reviews_per_product: usize,
    pub outlier_percentile: f64,
    pub outlier_policy: OutlierPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportingConfig {
    pub top_loved_products: usize,
    pub write_reports: bool,
}

impl PipelineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| PipelineError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: PipelineConfig = toml::from_str(&content).map_err(|e| PipelineError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Directory overrides from the environment take precedence over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(data_dir) = env::var(DATA_DIR_ENV) {
            self.paths.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(output_dir) = env::var(OUTPUT_DIR_ENV) {
            self.paths.output_dir = PathBuf::from(output_dir);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let cleaning = &self.cleaning;

        if !(0.0..=100.0).contains(&cleaning.max_null_pct) {
            return Err(PipelineError::Config {
                message: format!(
                    "max_null_pct must be within [0, 100], got {}",
                    cleaning.max_null_pct
                ),
            });
        }

        if !(cleaning.outlier_percentile > 0.0 && cleaning.outlier_percentile <= 1.0) {
            return Err(PipelineError::Config {
                message: format!(
                    "outlier_percentile must be within (0, 1], got {}",
                    cleaning.outlier_percentile
                ),
            });
        }

        if self.paths.products_file.is_empty() {
            return Err(PipelineError::Config {
                message: "products_file cannot be empty".to_string(),
            });
        }

        Ok(())
    }
}

impl PathsConfig {
    pub fn products_path(&self) -> PathBuf {
        self.data_dir.join(&self.products_file)
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/raw"),
            output_dir: PathBuf::from("analysis_output"),
            products_file: "product_info.csv".to_string(),
            reviews_prefix: "reviews_".to_string(),
        }
    }
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            required_columns: default_required_columns(),
            max_null_pct: 80.0,
            min_reviews_per_product: 20,
            outlier_percentile: 0.99,
            outlier_policy: OutlierPolicy::Report,
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            top_loved_products: 20,
            write_reports: true,
        }
    }
}

pub fn default_required_columns() -> Vec<String> {
    [
        columns::PRODUCT_ID,
        columns::PRODUCT_NAME,
        columns::BRAND_ID,
        columns::BRAND_NAME,
        columns::RATING,
        columns::LOVES_COUNT,
        columns::PRICE_USD,
        columns::PRIMARY_CATEGORY,
        columns::SECONDARY_CATEGORY,
        columns::TERTIARY_CATEGORY,
        columns::AUTHOR_ID,
        columns::REVIEW_TEXT,
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.paths.data_dir, PathBuf::from("data/raw"));
        assert_eq!(config.cleaning.min_reviews_per_product, 20);
        assert_eq!(config.cleaning.required_columns.len(), 12);
        assert_eq!(config.cleaning.outlier_policy, OutlierPolicy::Report);
        assert_eq!(config.reporting.top_loved_products, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [cleaning]
            min_reviews_per_product = 5
            outlier_policy = "drop"
            "#,
        )
        .unwrap();

        assert_eq!(config.cleaning.min_reviews_per_product, 5);
        assert_eq!(config.cleaning.outlier_policy, OutlierPolicy::Drop);
        assert_eq!(config.cleaning.max_null_pct, 80.0);
        assert_eq!(config.paths.products_file, "product_info.csv");
    }

    #[test]
    fn test_validation_rejects_bad_percentile() {
        let mut config = PipelineConfig::default();
        config.cleaning.outlier_percentile = 1.5;
        assert!(config.validate().is_err());

        config.cleaning.outlier_percentile = 0.99;
        config.cleaning.max_null_pct = 120.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        unsafe {
            env::set_var(DATA_DIR_ENV, "/tmp/review-data");
            env::set_var(OUTPUT_DIR_ENV, "/tmp/review-out");
        }

        let mut config = PipelineConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.paths.data_dir, PathBuf::from("/tmp/review-data"));
        assert_eq!(config.paths.output_dir, PathBuf::from("/tmp/review-out"));

        // Clean up
        unsafe {
            env::remove_var(DATA_DIR_ENV);
            env::remove_var(OUTPUT_DIR_ENV);
        }
    }

    #[test]
    fn test_from_file_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[cleaning\nmax_null_pct = ").unwrap();

        match PipelineConfig::from_file(&path) {
            Err(PipelineError::Config { message }) => assert!(message.contains("parse")),
            other => panic!("expected config error, got {:?}", other),
        }
    }
}
