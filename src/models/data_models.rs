use serde::{Deserialize, Serialize};
use std::fmt;

/// Column names shared by the loader, cleaner, normalizer and reporter.
pub mod columns {
    pub const PRODUCT_ID: &str = "product_id";
    pub const PRODUCT_NAME: &str = "product_name";
    pub const BRAND_ID: &str = "brand_id";
    pub const BRAND_NAME: &str = "brand_name";
    pub const AUTHOR_ID: &str = "author_id";
    pub const RATING: &str = "rating";
    pub const LOVES_COUNT: &str = "loves_count";
    pub const PRICE_USD: &str = "price_usd";
    pub const SALE_PRICE_USD: &str = "sale_price_usd";
    pub const SIZE: &str = "size";
    pub const PRIMARY_CATEGORY: &str = "primary_category";
    pub const SECONDARY_CATEGORY: &str = "secondary_category";
    pub const TERTIARY_CATEGORY: &str = "tertiary_category";
    pub const REVIEW_TEXT: &str = "review_text";
    pub const REVIEW_TITLE: &str = "review_title";
    pub const SUBMISSION_TIME: &str = "submission_time";

    // Derived
    pub const REVIEW_TEXT_CLEAN: &str = "review_text_clean";
    pub const RATING_BUCKET: &str = "rating_bucket";
    pub const FINAL_PRICE_USD: &str = "final_price_usd";
    pub const SIZE_QTY: &str = "size_qty";
    pub const SIZE_UNIT: &str = "size_unit";
    pub const PRICE_PER_100: &str = "price_per_100";
}

/// Canonical base unit every parsed size is converted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalUnit {
    Ml,
    G,
    Count,
}

impl CanonicalUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalUnit::Ml => "ml",
            CanonicalUnit::G => "g",
            CanonicalUnit::Count => "count",
        }
    }

    /// Volume and mass can be expressed per 100 units; packaging counts cannot.
    pub fn is_measurable(&self) -> bool {
        matches!(self, CanonicalUnit::Ml | CanonicalUnit::G)
    }
}

impl fmt::Display for CanonicalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingBucket {
    Negative,
    Neutral,
    Positive,
}

impl RatingBucket {
    /// Inclusive ranges: [1,2] negative, 3 neutral, [4,5] positive.
    pub fn from_rating(rating: f64) -> Option<Self> {
        if (1.0..=2.0).contains(&rating) {
            Some(RatingBucket::Negative)
        } else if rating == 3.0 {
            Some(RatingBucket::Neutral)
        } else if (4.0..=5.0).contains(&rating) {
            Some(RatingBucket::Positive)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RatingBucket::Negative => "negative",
            RatingBucket::Neutral => "neutral",
            RatingBucket::Positive => "positive",
        }
    }
}

impl fmt::Display for RatingBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

impl SentimentLabel {
    pub const POSITIVE_THRESHOLD: f64 = 0.05;
    pub const NEGATIVE_THRESHOLD: f64 = -0.05;

    pub fn from_compound(compound: f64) -> Self {
        if compound >= Self::POSITIVE_THRESHOLD {
            SentimentLabel::Positive
        } else if compound <= Self::NEGATIVE_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Positive => "positive",
        }
    }
}

/// Left-closed price tiers used by the price-range report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PriceTier {
    Under10,
    From10To20,
    From20To40,
    From40To60,
    From60To100,
    Over100,
}

impl PriceTier {
    pub fn from_price(price: f64) -> Option<Self> {
        if price.is_nan() || price < 0.0 {
            return None;
        }
        Some(match price {
            p if p < 10.0 => PriceTier::Under10,
            p if p < 20.0 => PriceTier::From10To20,
            p if p < 40.0 => PriceTier::From20To40,
            p if p < 60.0 => PriceTier::From40To60,
            p if p < 100.0 => PriceTier::From60To100,
            _ => PriceTier::Over100,
        })
    }

    pub fn label(&self) -> &'static str {
        match self {
            PriceTier::Under10 => "$0–10",
            PriceTier::From10To20 => "$10–20",
            PriceTier::From20To40 => "$20–40",
            PriceTier::From40To60 => "$40–60",
            PriceTier::From60To100 => "$60–100",
            PriceTier::Over100 => "$100+",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_bucket_ranges() {
        assert_eq!(RatingBucket::from_rating(1.0), Some(RatingBucket::Negative));
        assert_eq!(RatingBucket::from_rating(2.0), Some(RatingBucket::Negative));
        assert_eq!(RatingBucket::from_rating(3.0), Some(RatingBucket::Neutral));
        assert_eq!(RatingBucket::from_rating(4.0), Some(RatingBucket::Positive));
        assert_eq!(RatingBucket::from_rating(5.0), Some(RatingBucket::Positive));

        // Gaps and out-of-range values get no bucket
        assert_eq!(RatingBucket::from_rating(2.5), None);
        assert_eq!(RatingBucket::from_rating(0.0), None);
        assert_eq!(RatingBucket::from_rating(6.0), None);
    }

    #[test]
    fn test_sentiment_thresholds() {
        assert_eq!(SentimentLabel::from_compound(0.05), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_compound(-0.05), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_compound(0.0), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_compound(0.049), SentimentLabel::Neutral);
    }

    #[test]
    fn test_price_tier_bins_are_left_closed() {
        assert_eq!(PriceTier::from_price(0.0), Some(PriceTier::Under10));
        assert_eq!(PriceTier::from_price(9.99), Some(PriceTier::Under10));
        assert_eq!(PriceTier::from_price(10.0), Some(PriceTier::From10To20));
        assert_eq!(PriceTier::from_price(100.0), Some(PriceTier::Over100));
        assert_eq!(PriceTier::from_price(f64::NAN), None);
        assert_eq!(PriceTier::From40To60.label(), "$40–60");
    }
}
