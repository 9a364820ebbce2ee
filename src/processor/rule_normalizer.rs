use polars::prelude::*;
use std::str::FromStr;
use tracing::{debug, info};

use super::frame_ops::{
    f64_values, non_blank, optional_f64_values, optional_string_values, string_values,
};
use super::unit_parser::UnitParser;
use crate::error::Result;
use crate::models::{columns, CanonicalUnit, RatingBucket};

/// Derived fields for one record.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFields {
    pub final_price_usd: Option<f64>,
    pub size_qty: Option<f64>,
    pub size_unit: Option<CanonicalUnit>,
    pub price_per_100: Option<f64>,
    pub rating_bucket: Option<RatingBucket>,
}

/// Coerces prices and counts, parses sizes and attaches the derived columns.
#[derive(Debug, Clone, Default)]
pub struct RuleNormalizer {
    unit_parser: UnitParser,
}

impl RuleNormalizer {
    pub fn new() -> Self {
        RuleNormalizer {
            unit_parser: UnitParser::new(),
        }
    }

    pub fn normalize_record(
        &self,
        price_usd: Option<f64>,
        sale_price_usd: Option<f64>,
        size: Option<&str>,
        rating: Option<f64>,
    ) -> NormalizedFields {
        let parsed = self.unit_parser.parse(size);
        let price_per_100 = match (parsed, price_usd) {
            (Some(size), Some(price)) => size.price_per_100(price),
            _ => None,
        };

        NormalizedFields {
            final_price_usd: sale_price_usd.or(price_usd),
            size_qty: parsed.map(|size| size.quantity),
            size_unit: parsed.map(|size| size.unit),
            price_per_100,
            rating_bucket: rating.and_then(RatingBucket::from_rating),
        }
    }

    pub fn normalize_dataframe(&self, df: &mut DataFrame) -> Result<()> {
        // Normalize price columns
        self.normalize_price_column(df, columns::PRICE_USD)?;
        self.normalize_price_column(df, columns::SALE_PRICE_USD)?;

        if df.column(columns::LOVES_COUNT).is_ok() {
            self.normalize_count_column(df, columns::LOVES_COUNT)?;
        }

        self.attach_derived_columns(df)?;

        Ok(())
    }

    fn attach_derived_columns(&self, df: &mut DataFrame) -> Result<()> {
        let prices = optional_f64_values(df, columns::PRICE_USD)?;
        let sale_prices = optional_f64_values(df, columns::SALE_PRICE_USD)?;
        let sizes = optional_string_values(df, columns::SIZE)?;
        let ratings = if df.column(columns::RATING).is_ok() {
            f64_values(df, columns::RATING)?
        } else {
            vec![None; df.height()]
        };

        let height = df.height();
        let mut final_prices = Vec::with_capacity(height);
        let mut size_qtys = Vec::with_capacity(height);
        let mut size_units = Vec::with_capacity(height);
        let mut per_100 = Vec::with_capacity(height);
        let mut buckets = Vec::with_capacity(height);

        for i in 0..height {
            let fields =
                self.normalize_record(prices[i], sale_prices[i], sizes[i].as_deref(), ratings[i]);
            final_prices.push(fields.final_price_usd);
            size_qtys.push(fields.size_qty);
            size_units.push(fields.size_unit.map(|unit| unit.as_str()));
            per_100.push(fields.price_per_100);
            buckets.push(fields.rating_bucket.map(|bucket| bucket.as_str()));
        }

        let parsed_sizes = size_qtys.iter().filter(|qty| qty.is_some()).count();
        let unit_priced = per_100.iter().filter(|value| value.is_some()).count();
        info!(
            "Parsed sizes for {} of {} rows, {} with a price per 100 units",
            parsed_sizes, height, unit_priced
        );

        df.with_column(Series::new(columns::RATING_BUCKET.into(), buckets))?;
        df.with_column(Series::new(columns::FINAL_PRICE_USD.into(), final_prices))?;
        df.with_column(Series::new(columns::SIZE_QTY.into(), size_qtys))?;
        df.with_column(Series::new(columns::SIZE_UNIT.into(), size_units))?;
        df.with_column(Series::new(columns::PRICE_PER_100.into(), per_100))?;

        Ok(())
    }

    fn normalize_price_column(&self, df: &mut DataFrame, col_name: &str) -> Result<()> {
        if df.column(col_name).is_err() {
            debug!("Price column '{}' not present, skipping", col_name);
            return Ok(());
        }

        let normalized: Vec<Option<f64>> = string_values(df, col_name)?
            .iter()
            .map(|value| parse_price(value.as_deref()))
            .collect();

        df.with_column(Series::new(col_name.into(), normalized))?;
        Ok(())
    }

    fn normalize_count_column(&self, df: &mut DataFrame, col_name: &str) -> Result<()> {
        let normalized: Vec<Option<i64>> = string_values(df, col_name)?
            .iter()
            .map(|value| parse_count(value.as_deref()))
            .collect();

        df.with_column(Series::new(col_name.into(), normalized))?;
        Ok(())
    }
}

/// "$1,250.00" -> 1250.0. Negative or non-numeric amounts are missing.
pub fn parse_price(value: Option<&str>) -> Option<f64> {
    let cleaned = non_blank(value)?.replace(['$', ','], "");
    f64::from_str(cleaned.trim())
        .ok()
        .filter(|price| price.is_finite() && *price >= 0.0)
}

/// Integral counters; "1,234" and "1234.0" are accepted.
pub fn parse_count(value: Option<&str>) -> Option<i64> {
    let cleaned = non_blank(value)?.replace(',', "");
    if let Ok(count) = i64::from_str(&cleaned) {
        return (count >= 0).then_some(count);
    }
    f64::from_str(&cleaned)
        .ok()
        .filter(|count| count.is_finite() && *count >= 0.0 && count.fract() == 0.0)
        .map(|count| count as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_per_100_only_for_measurable_units() {
        let normalizer = RuleNormalizer::new();

        let grams = normalizer.normalize_record(Some(20.0), None, Some("50 g"), Some(5.0));
        assert_eq!(grams.price_per_100, Some(40.0));
        assert_eq!(grams.size_unit, Some(CanonicalUnit::G));

        let pieces = normalizer.normalize_record(Some(20.0), None, Some("3 pcs"), Some(5.0));
        assert_eq!(pieces.size_qty, Some(3.0));
        assert_eq!(pieces.size_unit, Some(CanonicalUnit::Count));
        assert_eq!(pieces.price_per_100, None);

        let no_price = normalizer.normalize_record(None, Some(10.0), Some("50 g"), Some(5.0));
        assert_eq!(no_price.price_per_100, None);
        assert_eq!(no_price.final_price_usd, Some(10.0));
    }

    #[test]
    fn test_final_price_prefers_sale_price() {
        let normalizer = RuleNormalizer::new();
        let on_sale = normalizer.normalize_record(Some(30.0), Some(22.5), None, None);
        assert_eq!(on_sale.final_price_usd, Some(22.5));

        let full_price = normalizer.normalize_record(Some(30.0), None, None, None);
        assert_eq!(full_price.final_price_usd, Some(30.0));

        let neither = normalizer.normalize_record(None, None, None, None);
        assert_eq!(neither.final_price_usd, None);
    }

    #[test]
    fn test_rating_bucket_assignment() {
        let normalizer = RuleNormalizer::new();
        let bucket = |rating| normalizer.normalize_record(None, None, None, rating).rating_bucket;

        assert_eq!(bucket(Some(1.0)), Some(RatingBucket::Negative));
        assert_eq!(bucket(Some(3.0)), Some(RatingBucket::Neutral));
        assert_eq!(bucket(Some(4.0)), Some(RatingBucket::Positive));
        assert_eq!(bucket(Some(3.5)), None);
        assert_eq!(bucket(None), None);
    }

    #[test]
    fn test_price_parsing() {
        assert_eq!(parse_price(Some("$1,250.00")), Some(1250.0));
        assert_eq!(parse_price(Some(" 19.5 ")), Some(19.5));
        assert_eq!(parse_price(Some("-3")), None);
        assert_eq!(parse_price(Some("free")), None);
        assert_eq!(parse_price(Some("")), None);
        assert_eq!(parse_price(None), None);
    }

    #[test]
    fn test_count_parsing() {
        assert_eq!(parse_count(Some("1,234")), Some(1234));
        assert_eq!(parse_count(Some("56.0")), Some(56));
        assert_eq!(parse_count(Some("5.5")), None);
        assert_eq!(parse_count(Some("-1")), None);
        assert_eq!(parse_count(Some("n/a")), None);
    }

    #[test]
    fn test_normalize_dataframe_adds_derived_columns() {
        let mut df = df!(
            "product_id" => ["P1", "P2", "P3"],
            "rating" => [5.0, 3.0, 1.0],
            "price_usd" => [Some("20"), Some("$45.00"), None],
            "sale_price_usd" => [None, Some("30"), Some("12")],
            "size" => [Some("50 g"), Some("2 oz/ 60 mL"), Some("3 pcs")],
            "loves_count" => ["1,000", "20", "oops"]
        )
        .unwrap();

        RuleNormalizer::new().normalize_dataframe(&mut df).unwrap();

        let final_prices: Vec<Option<f64>> =
            df.column("final_price_usd").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(final_prices, vec![Some(20.0), Some(30.0), Some(12.0)]);

        let per_100: Vec<Option<f64>> =
            df.column("price_per_100").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(per_100, vec![Some(40.0), Some(75.0), None]);

        let units: Vec<Option<&str>> =
            df.column("size_unit").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(units, vec![Some("g"), Some("ml"), Some("count")]);

        let buckets: Vec<Option<&str>> =
            df.column("rating_bucket").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(buckets, vec![Some("positive"), Some("neutral"), Some("negative")]);

        let loves: Vec<Option<i64>> =
            df.column("loves_count").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(loves, vec![Some(1000), Some(20), None]);
    }
}
