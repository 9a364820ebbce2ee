use polars::prelude::*;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::models::{PriceTier, columns};
use crate::processor::SentimentScorer;
use crate::processor::frame_ops::{
    filter_rows, first_occurrence_mask, non_blank, optional_f64_values, optional_string_values,
    string_values,
};

pub const UNKNOWN: &str = "Unknown";

pub const AVG_RATING: &str = "avg_rating";
pub const REVIEW_COUNT: &str = "review_count";
pub const PRODUCT_COUNT: &str = "product_count";
pub const REVIEW_TITLE_CLEAN: &str = "review_title_clean";
pub const TITLE_COMPOUND: &str = "title_compound";
pub const TITLE_SENTIMENT: &str = "title_sentiment";
pub const PRICE_RANGE: &str = "price_range";
pub const TOTAL_LOVES: &str = "total_loves";

const TIER_ORDER: &str = "tier_order";

/// Descriptive columns that read as "Unknown" in reports when missing.
const LABEL_COLUMNS: [&str; 5] = [
    columns::BRAND_NAME,
    columns::PRODUCT_NAME,
    columns::PRIMARY_CATEGORY,
    columns::SECONDARY_CATEGORY,
    columns::TERTIARY_CATEGORY,
];

/// One named output table.
pub struct Report {
    pub file_name: &'static str,
    pub data: DataFrame,
}

/// Builds the aggregate reports from a cleaned review table.
pub struct ReportBuilder<'a> {
    scorer: &'a dyn SentimentScorer,
    top_loved: usize,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(scorer: &'a dyn SentimentScorer, top_loved: usize) -> Self {
        ReportBuilder { scorer, top_loved }
    }

    pub fn build_all(&self, cleaned: &DataFrame) -> Result<Vec<Report>> {
        let df = with_label_defaults(cleaned)?;

        let reports = vec![
            Report {
                file_name: "products_rating_brand_wise.csv",
                data: self.rating_by_brand(&df)?,
            },
            Report {
                file_name: "products_reviews_sentiments.csv",
                data: self.title_sentiments(&df)?,
            },
            Report {
                file_name: "product_categories.csv",
                data: self.category_counts(&df)?,
            },
            Report {
                file_name: "products_count.csv",
                data: self.products_per_brand(&df)?,
            },
            Report {
                file_name: "products_price_range.csv",
                data: self.price_ranges(&df)?,
            },
            Report {
                file_name: "loves_count.csv",
                data: self.most_loved(&df)?,
            },
            Report {
                file_name: "brands_loves_count.csv",
                data: self.loves_by(&df, columns::BRAND_NAME)?,
            },
            Report {
                file_name: "category_loves_count.csv",
                data: self.loves_by(&df, columns::PRIMARY_CATEGORY)?,
            },
            Report {
                file_name: "price_per_100.csv",
                data: self.unit_prices(&df)?,
            },
        ];

        for report in &reports {
            debug!("{}: {} rows", report.file_name, report.data.height());
        }
        info!("Built {} reports", reports.len());

        Ok(reports)
    }

    pub fn rating_by_brand(&self, df: &DataFrame) -> Result<DataFrame> {
        require(df, &[columns::PRODUCT_ID, columns::RATING])?;

        let out = df
            .clone()
            .lazy()
            .group_by_stable([
                col(columns::BRAND_NAME),
                col(columns::PRODUCT_ID),
                col(columns::PRODUCT_NAME),
            ])
            .agg([
                col(columns::RATING).mean().alias(AVG_RATING),
                col(columns::RATING).count().alias(REVIEW_COUNT),
            ])
            .sort_by_exprs(
                [col(columns::BRAND_NAME), col(AVG_RATING), col(REVIEW_COUNT)],
                SortMultipleOptions::default()
                    .with_order_descending_multi([false, true, true])
                    .with_maintain_order(true),
            )
            .collect()?;
        Ok(out)
    }

    /// Scores every review title. Missing titles score as empty text.
    pub fn title_sentiments(&self, df: &DataFrame) -> Result<DataFrame> {
        require(df, &[columns::PRODUCT_ID])?;

        let titles = optional_string_values(df, columns::REVIEW_TITLE)?;
        let mut clean_titles = Vec::with_capacity(titles.len());
        let mut compounds = Vec::with_capacity(titles.len());
        let mut labels = Vec::with_capacity(titles.len());

        for title in &titles {
            let clean = title.as_deref().unwrap_or("").trim().to_string();
            let compound = self.scorer.score(&clean);
            labels.push(self.scorer.label(&clean).as_str());
            compounds.push(compound);
            clean_titles.push(clean);
        }

        let out = DataFrame::new(vec![
            df.column(columns::BRAND_NAME)?.clone(),
            df.column(columns::PRODUCT_ID)?.clone(),
            df.column(columns::PRODUCT_NAME)?.clone(),
            Series::new(columns::REVIEW_TITLE.into(), titles).into(),
            Series::new(REVIEW_TITLE_CLEAN.into(), clean_titles).into(),
            Series::new(TITLE_COMPOUND.into(), compounds).into(),
            Series::new(TITLE_SENTIMENT.into(), labels).into(),
        ])?;
        Ok(out)
    }

    pub fn category_counts(&self, df: &DataFrame) -> Result<DataFrame> {
        let products = first_per_product(df)?;

        let out = products
            .lazy()
            .group_by_stable([
                col(columns::BRAND_NAME),
                col(columns::PRIMARY_CATEGORY),
                col(columns::SECONDARY_CATEGORY),
                col(columns::TERTIARY_CATEGORY),
            ])
            .agg([col(columns::PRODUCT_ID).n_unique().alias(PRODUCT_COUNT)])
            .sort_by_exprs(
                [col(columns::BRAND_NAME), col(PRODUCT_COUNT)],
                SortMultipleOptions::default()
                    .with_order_descending_multi([false, true])
                    .with_maintain_order(true),
            )
            .collect()?;
        Ok(out)
    }

    pub fn products_per_brand(&self, df: &DataFrame) -> Result<DataFrame> {
        require(df, &[columns::PRODUCT_ID])?;

        let out = df
            .clone()
            .lazy()
            .group_by_stable([col(columns::BRAND_NAME)])
            .agg([col(columns::PRODUCT_ID).n_unique().alias(PRODUCT_COUNT)])
            .sort_by_exprs(
                [col(columns::BRAND_NAME)],
                SortMultipleOptions::default().with_maintain_order(true),
            )
            .collect()?;
        Ok(out)
    }

    /// Distinct products per category, brand and price tier. Only observed
    /// combinations appear.
    pub fn price_ranges(&self, df: &DataFrame) -> Result<DataFrame> {
        let products = first_per_product(df)?;

        let prices = optional_f64_values(&products, columns::FINAL_PRICE_USD)?;
        let tiers: Vec<Option<PriceTier>> = prices
            .iter()
            .map(|price| price.filter(|p| *p > 0.0).and_then(PriceTier::from_price))
            .collect();
        let keep: Vec<bool> = tiers.iter().map(Option::is_some).collect();

        let mut priced = products;
        priced.with_column(Series::new(
            PRICE_RANGE.into(),
            tiers.iter().map(|tier| tier.map(|t| t.label())).collect::<Vec<_>>(),
        ))?;
        priced.with_column(Series::new(
            TIER_ORDER.into(),
            tiers.iter().map(|tier| tier.map(|t| t as u32)).collect::<Vec<_>>(),
        ))?;
        let priced = filter_rows(&priced, &keep)?;

        let out = priced
            .lazy()
            .group_by_stable([
                col(columns::PRIMARY_CATEGORY),
                col(columns::BRAND_NAME),
                col(PRICE_RANGE),
                col(TIER_ORDER),
            ])
            .agg([col(columns::PRODUCT_ID).n_unique().alias(PRODUCT_COUNT)])
            .sort_by_exprs(
                [col(columns::PRIMARY_CATEGORY), col(TIER_ORDER), col(PRODUCT_COUNT)],
                SortMultipleOptions::default()
                    .with_order_descending_multi([false, false, true])
                    .with_maintain_order(true),
            )
            .collect()?
            .drop(TIER_ORDER)?;
        Ok(out)
    }

    /// Top products by their highest observed loves count.
    pub fn most_loved(&self, df: &DataFrame) -> Result<DataFrame> {
        require(df, &[columns::PRODUCT_ID, columns::LOVES_COUNT])?;

        let out = df
            .clone()
            .lazy()
            .group_by_stable([
                col(columns::PRODUCT_ID),
                col(columns::PRODUCT_NAME),
                col(columns::BRAND_NAME),
            ])
            .agg([col(columns::LOVES_COUNT).max()])
            .sort_by_exprs(
                [col(columns::LOVES_COUNT)],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_nulls_last(true)
                    .with_maintain_order(true),
            )
            .limit(self.top_loved as IdxSize)
            .collect()?;
        Ok(out)
    }

    /// Sums each product's highest loves count within `group_column`.
    pub fn loves_by(&self, df: &DataFrame, group_column: &str) -> Result<DataFrame> {
        require(df, &[columns::PRODUCT_ID, columns::LOVES_COUNT])?;

        let out = df
            .clone()
            .lazy()
            .group_by_stable([col(columns::PRODUCT_ID), col(group_column)])
            .agg([col(columns::LOVES_COUNT).max()])
            .group_by_stable([col(group_column)])
            .agg([
                col(columns::LOVES_COUNT).sum().alias(TOTAL_LOVES),
                col(columns::PRODUCT_ID).n_unique().alias(PRODUCT_COUNT),
            ])
            .sort_by_exprs(
                [col(TOTAL_LOVES)],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_maintain_order(true),
            )
            .collect()?;
        Ok(out)
    }

    pub fn unit_prices(&self, df: &DataFrame) -> Result<DataFrame> {
        let products = first_per_product(df)?;

        let keep: Vec<bool> = optional_f64_values(&products, columns::PRICE_PER_100)?
            .iter()
            .map(Option::is_some)
            .collect();
        let priced = filter_rows(&products, &keep)?;

        let mut selected = Vec::new();
        for name in [
            columns::PRODUCT_ID,
            columns::PRODUCT_NAME,
            columns::BRAND_NAME,
            columns::SIZE,
            columns::SIZE_QTY,
            columns::SIZE_UNIT,
            columns::PRICE_USD,
            columns::PRICE_PER_100,
        ] {
            if priced.column(name).is_ok() {
                selected.push(name);
            }
        }

        let out = priced
            .select(selected)?
            .lazy()
            .sort_by_exprs(
                [col(columns::PRICE_PER_100)],
                SortMultipleOptions::default().with_maintain_order(true),
            )
            .collect()?;
        Ok(out)
    }
}

fn require(df: &DataFrame, names: &[&str]) -> Result<()> {
    for name in names {
        if df.column(name).is_err() {
            return Err(PipelineError::missing_column(name, "cleaned table"));
        }
    }
    Ok(())
}

/// Fills null or blank brand, product name and category cells with "Unknown".
/// Absent columns are added in full.
pub fn with_label_defaults(df: &DataFrame) -> Result<DataFrame> {
    require(df, &[columns::PRODUCT_ID])?;

    let mut out = df.clone();
    for name in LABEL_COLUMNS {
        let filled: Vec<String> = optional_string_values(df, name)?
            .iter()
            .map(|value| non_blank(value.as_deref()).unwrap_or(UNKNOWN).to_string())
            .collect();
        out.with_column(Series::new(name.into(), filled))?;
    }
    Ok(out)
}

/// The first row of each product, in table order.
pub fn first_per_product(df: &DataFrame) -> Result<DataFrame> {
    require(df, &[columns::PRODUCT_ID])?;
    let keep = first_occurrence_mask(string_values(df, columns::PRODUCT_ID)?);
    filter_rows(df, &keep)
}
