use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

use super::cleaning_report::CleaningReport;
use super::frame_ops::{
    filter_rows, first_occurrence_mask, non_blank, optional_string_values, row_keys,
    string_values,
};
use super::rule_normalizer::{parse_price, RuleNormalizer};
use crate::config::{CleaningConfig, OutlierPolicy};
use crate::error::{PipelineError, Result};
use crate::models::columns;

/// Columns whose coverage is logged after filtering, without aborting the run.
const INFORMATIONAL_COLUMNS: [&str; 6] = [
    columns::BRAND_NAME,
    columns::PRIMARY_CATEGORY,
    columns::SECONDARY_CATEGORY,
    columns::TERTIARY_CATEGORY,
    columns::PRICE_USD,
    columns::REVIEW_TITLE,
];

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// The cleaned, enriched table plus what happened to it on the way.
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub data: DataFrame,
    pub report: CleaningReport,
}

/// Validation, deduplication and filtering over the merged product/review table.
///
/// Stages run in a fixed order; each takes the previous stage's frame and
/// returns a new one. Only the coverage check can fail the run.
pub struct DataCleaner {
    config: CleaningConfig,
    normalizer: RuleNormalizer,
}

impl DataCleaner {
    pub fn new(config: CleaningConfig) -> Self {
        DataCleaner {
            config,
            normalizer: RuleNormalizer::new(),
        }
    }

    pub fn clean(&self, df: DataFrame) -> Result<CleanOutcome> {
        let mut report = CleaningReport {
            rows_in: df.height(),
            ..Default::default()
        };

        info!(
            "Cleaning {} rows x {} columns",
            df.height(),
            df.width()
        );
        debug!("Columns: {:?}", df.get_column_names());

        report.required_null_pct = self.check_coverage(&df)?;

        let df = self.remove_exact_duplicates(df, &mut report)?;
        let df = self.coerce_types(df, &mut report)?;
        let df = self.drop_missing_ratings(df, &mut report)?;
        let df = self.enforce_min_sample(df, &mut report)?;
        let df = self.add_clean_text(df)?;
        let df = self.remove_near_duplicates(df, &mut report)?;
        // Dedup can push a product back under the threshold
        let df = self.enforce_min_sample(df, &mut report)?;
        let df = self.handle_price_outliers(df, &mut report)?;

        report.informational_null_pct = null_percentages(&df, &INFORMATIONAL_COLUMNS)?;
        for (column, pct) in &report.informational_null_pct {
            debug!("{}: {:.2}% missing", column, pct);
        }

        let mut df = df;
        self.normalizer.normalize_dataframe(&mut df)?;

        report.rating_buckets = bucket_distribution(&df)?;
        report.products_out = distinct_products(&df)?;
        report.rows_out = df.height();

        info!("Cleaning complete: {}", report.summary());

        Ok(CleanOutcome { data: df, report })
    }

    /// Fails with `InsufficientData` when a required column is mostly null.
    pub fn check_coverage(&self, df: &DataFrame) -> Result<BTreeMap<String, f64>> {
        let mut percentages = BTreeMap::new();

        for column in &self.config.required_columns {
            let null_pct = match df.column(column) {
                Ok(values) => percentage(values.null_count(), df.height()),
                Err(_) => {
                    warn!("Required column '{}' is missing from the input", column);
                    100.0
                }
            };

            debug!("Required column {}: {:.2}% missing", column, null_pct);

            // Whole percentage points, so 80.9% still passes an 80% limit
            if null_pct.trunc() > self.config.max_null_pct {
                warn!(
                    "Missing percentage is too high for column '{}': {:.2}%",
                    column, null_pct
                );
                return Err(PipelineError::InsufficientData {
                    column: column.clone(),
                    null_pct,
                });
            }

            percentages.insert(column.clone(), null_pct);
        }

        Ok(percentages)
    }

    fn remove_exact_duplicates(
        &self,
        df: DataFrame,
        report: &mut CleaningReport,
    ) -> Result<DataFrame> {
        let keep = first_occurrence_mask(row_keys(&df)?);
        let removed = keep.iter().filter(|k| !**k).count();

        if removed == 0 {
            info!("No duplicate rows found");
            return Ok(df);
        }

        info!("Removed {} duplicate rows", removed);
        report.exact_duplicates_removed = removed;
        filter_rows(&df, &keep)
    }

    fn coerce_types(&self, mut df: DataFrame, report: &mut CleaningReport) -> Result<DataFrame> {
        let product_ids: Vec<Option<String>> = string_values(&df, columns::PRODUCT_ID)
            .map_err(|_| PipelineError::missing_column(columns::PRODUCT_ID, "merged table"))?
            .into_iter()
            .map(|id| non_blank(id.as_deref()).map(str::to_string))
            .collect();
        df.with_column(Series::new(columns::PRODUCT_ID.into(), product_ids))?;

        if df.column(columns::AUTHOR_ID).is_ok() {
            let author_ids = string_values(&df, columns::AUTHOR_ID)?;
            df.with_column(Series::new(columns::AUTHOR_ID.into(), author_ids))?;
        }

        let raw_ratings = optional_string_values(&df, columns::RATING)?;
        let ratings: Vec<Option<f64>> = raw_ratings
            .iter()
            .map(|value| parse_rating(value.as_deref()))
            .collect();
        report.unparsable_ratings = raw_ratings
            .iter()
            .zip(&ratings)
            .filter(|(raw, parsed)| non_blank(raw.as_deref()).is_some() && parsed.is_none())
            .count();
        if report.unparsable_ratings > 0 {
            warn!("{} ratings could not be parsed", report.unparsable_ratings);
        }
        df.with_column(Series::new(columns::RATING.into(), ratings))?;

        let review_text: Vec<String> = optional_string_values(&df, columns::REVIEW_TEXT)?
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();
        df.with_column(Series::new(columns::REVIEW_TEXT.into(), review_text))?;

        let needs_timestamp_parse = df
            .column(columns::SUBMISSION_TIME)
            .map(|column| !matches!(column.dtype(), DataType::Datetime(_, _)))
            .unwrap_or(false);

        if needs_timestamp_parse {
            let raw_times = string_values(&df, columns::SUBMISSION_TIME)?;
            let millis: Vec<Option<i64>> = raw_times
                .iter()
                .map(|value| parse_timestamp(value.as_deref()))
                .collect();
            report.unparsable_timestamps = raw_times
                .iter()
                .zip(&millis)
                .filter(|(raw, parsed)| non_blank(raw.as_deref()).is_some() && parsed.is_none())
                .count();

            let timestamps = Series::new(columns::SUBMISSION_TIME.into(), millis)
                .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
            df.with_column(timestamps)?;
        }

        debug!("Coerced column types: {:?}", df.dtypes());
        Ok(df)
    }

    fn drop_missing_ratings(
        &self,
        df: DataFrame,
        report: &mut CleaningReport,
    ) -> Result<DataFrame> {
        let keep: Vec<bool> = df
            .column(columns::RATING)?
            .f64()?
            .into_iter()
            .map(|rating| rating.is_some())
            .collect();
        let dropped = keep.iter().filter(|k| !**k).count();
        report.rows_missing_rating += dropped;

        info!("Dropped {} rows without a valid rating", dropped);
        filter_rows(&df, &keep)
    }

    /// Keeps only products with at least `min_reviews_per_product` rows.
    /// Rows without a product id belong to no product and are dropped too.
    fn enforce_min_sample(
        &self,
        df: DataFrame,
        report: &mut CleaningReport,
    ) -> Result<DataFrame> {
        let product_ids = string_values(&df, columns::PRODUCT_ID)?;

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for id in product_ids.iter().flatten() {
            *counts.entry(id.as_str()).or_default() += 1;
        }

        let threshold = self.config.min_reviews_per_product;
        let valid: HashSet<&str> = counts
            .iter()
            .filter(|(_, count)| **count >= threshold)
            .map(|(id, _)| *id)
            .collect();

        let keep: Vec<bool> = product_ids
            .iter()
            .map(|id| id.as_deref().is_some_and(|id| valid.contains(id)))
            .collect();
        let dropped_rows = keep.iter().filter(|k| !**k).count();
        let dropped_products = counts.len() - valid.len();

        info!("Products before: {}", counts.len());
        info!("Rows before: {}", df.height());
        info!("Products after: {}", valid.len());
        info!("Rows after: {}", df.height() - dropped_rows);

        report.products_below_threshold += dropped_products;
        report.rows_below_threshold += dropped_rows;

        if dropped_rows == 0 {
            return Ok(df);
        }
        filter_rows(&df, &keep)
    }

    fn add_clean_text(&self, mut df: DataFrame) -> Result<DataFrame> {
        let cleaned: Vec<String> = string_values(&df, columns::REVIEW_TEXT)?
            .iter()
            .map(|text| clean_text(text.as_deref().unwrap_or_default()))
            .collect();

        df.with_column(Series::new(columns::REVIEW_TEXT_CLEAN.into(), cleaned))?;
        Ok(df)
    }

    /// Same product, same rating, same cleaned text: the same review.
    fn remove_near_duplicates(
        &self,
        df: DataFrame,
        report: &mut CleaningReport,
    ) -> Result<DataFrame> {
        let product_ids = string_values(&df, columns::PRODUCT_ID)?;
        let ratings: Vec<Option<f64>> = df.column(columns::RATING)?.f64()?.into_iter().collect();
        let texts = string_values(&df, columns::REVIEW_TEXT_CLEAN)?;

        let keys = product_ids
            .into_iter()
            .zip(ratings)
            .zip(texts)
            .map(|((id, rating), text)| (id, rating.map(f64::to_bits), text));
        let keep = first_occurrence_mask(keys);

        let before = df.height();
        let df = filter_rows(&df, &keep)?;
        let after = df.height();

        info!("Rows before: {}", before);
        info!("Rows after : {}", after);
        info!("Duplicates removed: {}", before - after);

        report.near_duplicates_removed = before - after;
        Ok(df)
    }

    fn handle_price_outliers(
        &self,
        df: DataFrame,
        report: &mut CleaningReport,
    ) -> Result<DataFrame> {
        let prices: Vec<Option<f64>> = optional_string_values(&df, columns::PRICE_USD)?
            .iter()
            .map(|value| parse_price(value.as_deref()))
            .collect();

        let positive: Vec<f64> = prices.iter().flatten().copied().filter(|p| *p > 0.0).collect();
        let Some(threshold) = quantile(&positive, self.config.outlier_percentile) else {
            info!("No positive prices, skipping outlier detection");
            return Ok(df);
        };

        let is_outlier: Vec<bool> = prices
            .iter()
            .map(|price| price.is_some_and(|p| p > 0.0 && p >= threshold))
            .collect();
        let outliers = is_outlier.iter().filter(|o| **o).count();

        info!(
            "{:.0}th percentile price: {:.2} ({} rows at or above)",
            self.config.outlier_percentile * 100.0,
            threshold,
            outliers
        );
        report.price_percentile = Some(threshold);
        report.price_outliers = outliers;

        match self.config.outlier_policy {
            OutlierPolicy::Report => {
                info!("Rows after price filtering: {}", positive.len() - outliers);
                Ok(df)
            }
            OutlierPolicy::Drop => {
                let keep: Vec<bool> = is_outlier.iter().map(|o| !o).collect();
                let df = filter_rows(&df, &keep)?;
                report.outliers_dropped = outliers;
                info!("Dropped {} price outliers", outliers);
                self.enforce_min_sample(df, report)
            }
        }
    }
}

/// Lower-case, collapse whitespace runs to one space, trim.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Ratings outside [1, 5] are treated as unparsable.
pub fn parse_rating(value: Option<&str>) -> Option<f64> {
    non_blank(value)?
        .parse::<f64>()
        .ok()
        .filter(|rating| (1.0..=5.0).contains(rating))
}

/// Milliseconds since the epoch, or `None` when no known format matches.
pub fn parse_timestamp(value: Option<&str>) -> Option<i64> {
    let value = non_blank(value)?;

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.timestamp_millis());
    }

    for format in TIMESTAMP_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.and_utc().timestamp_millis());
        }
    }

    DATE_FORMATS.iter().find_map(|format| {
        NaiveDate::parse_from_str(value, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|datetime| datetime.and_utc().timestamp_millis())
    })
}

/// Linear interpolation between closest ranks.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

fn null_percentages(df: &DataFrame, names: &[&str]) -> Result<BTreeMap<String, f64>> {
    let mut percentages = BTreeMap::new();
    for name in names {
        if let Ok(column) = df.column(name) {
            percentages.insert(
                name.to_string(),
                percentage(column.null_count(), df.height()),
            );
        }
    }
    Ok(percentages)
}

fn bucket_distribution(df: &DataFrame) -> Result<BTreeMap<String, usize>> {
    let mut distribution = BTreeMap::new();
    for bucket in string_values(df, columns::RATING_BUCKET)? {
        let key = bucket.unwrap_or_else(|| "absent".to_string());
        *distribution.entry(key).or_default() += 1;
    }
    for (bucket, count) in &distribution {
        debug!("rating_bucket {}: {}", bucket, count);
    }
    Ok(distribution)
}

fn distinct_products(df: &DataFrame) -> Result<usize> {
    let ids: HashSet<String> = string_values(df, columns::PRODUCT_ID)?
        .into_iter()
        .flatten()
        .collect();
    Ok(ids.len())
}
