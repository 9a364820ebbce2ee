use serde::Serialize;
use std::collections::BTreeMap;

/// Counts collected while cleaning, written out as `cleaning_summary.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub required_null_pct: BTreeMap<String, f64>,
    pub exact_duplicates_removed: usize,
    pub unparsable_ratings: usize,
    pub unparsable_timestamps: usize,
    pub rows_missing_rating: usize,
    pub products_below_threshold: usize,
    pub rows_below_threshold: usize,
    pub near_duplicates_removed: usize,
    pub price_percentile: Option<f64>,
    pub price_outliers: usize,
    pub outliers_dropped: usize,
    pub informational_null_pct: BTreeMap<String, f64>,
    pub rating_buckets: BTreeMap<String, usize>,
    pub products_out: usize,
    pub rows_out: usize,
}

impl CleaningReport {
    pub fn rows_removed(&self) -> usize {
        self.rows_in.saturating_sub(self.rows_out)
    }

    pub fn retention_rate(&self) -> f64 {
        if self.rows_in == 0 {
            0.0
        } else {
            (self.rows_out as f64 / self.rows_in as f64) * 100.0
        }
    }

    pub fn summary(&self) -> String {
        let percentile = self
            .price_percentile
            .map(|p| format!("{:.2}", p))
            .unwrap_or_else(|| "n/a".to_string());

        format!(
            "{} rows in, {} rows out ({:.1}% retained) across {} products; \
             {} exact and {} near duplicates removed, {} rows without rating, \
             {} products below sample threshold, price p99 {} with {} outliers",
            self.rows_in,
            self.rows_out,
            self.retention_rate(),
            self.products_out,
            self.exact_duplicates_removed,
            self.near_duplicates_removed,
            self.rows_missing_rating,
            self.products_below_threshold,
            percentile,
            self.price_outliers,
        )
    }
}
