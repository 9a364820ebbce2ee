use glob::glob;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::PathsConfig;
use crate::error::{PipelineError, Result};
use crate::models::columns;
use crate::processor::frame_ops::{filter_rows, non_blank, string_values};

/// Suffix polars gives right-hand columns that collide with left-hand ones on join.
const JOIN_SUFFIX: &str = "_right";

/// Reads the product table and every review part, and merges them into one table.
pub struct CsvLoader {
    paths: PathsConfig,
}

impl CsvLoader {
    pub fn new(paths: PathsConfig) -> Self {
        CsvLoader { paths }
    }

    pub fn load_merged(&self) -> Result<DataFrame> {
        let products_path = self.paths.products_path();
        let products = read_csv(&products_path)?;
        info!(
            "Loaded {} products from {}",
            products.height(),
            products_path.display()
        );

        let review_files = self.review_files()?;
        let mut parts = Vec::with_capacity(review_files.len());
        for path in &review_files {
            let part = read_csv(path)?;
            info!("Loaded {} reviews from {}", part.height(), path.display());
            parts.push(part);
        }

        let reviews = union_frames(parts)?;
        info!("Combined {} review rows from {} files", reviews.height(), review_files.len());

        merge_products_reviews(products, reviews)
    }

    /// `<data_dir>/<reviews_prefix>*.csv`, sorted by file name.
    pub fn review_files(&self) -> Result<Vec<PathBuf>> {
        let pattern = format!("{}*.csv", self.paths.reviews_prefix);
        let full_pattern = self.paths.data_dir.join(&pattern);
        let pattern_str = full_pattern.to_string_lossy();

        let mut files = Vec::new();
        for entry in glob(&pattern_str)? {
            let path = entry?;
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            return Err(PipelineError::NoInputFiles {
                dir: self.paths.data_dir.clone(),
                pattern,
            });
        }

        debug!("Review files: {:?}", files);
        Ok(files)
    }
}

/// Every column is read as a string; coercion happens during cleaning.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

/// Stacks frames whose column sets may differ; missing columns are filled with nulls.
pub fn union_frames(frames: Vec<DataFrame>) -> Result<DataFrame> {
    let mut all_columns: Vec<String> = Vec::new();
    for frame in &frames {
        for name in frame.get_column_names() {
            if !all_columns.iter().any(|c| c == name.as_str()) {
                all_columns.push(name.to_string());
            }
        }
    }

    let mut combined: Option<DataFrame> = None;
    for mut frame in frames {
        for name in &all_columns {
            if frame.column(name).is_err() {
                debug!("Filling missing column '{}' with nulls", name);
                frame.with_column(Series::full_null(
                    name.as_str().into(),
                    frame.height(),
                    &DataType::String,
                ))?;
            }
        }

        let aligned = frame.select(all_columns.iter().map(String::as_str))?;
        let aligned = cast_all_to_string(aligned)?;

        combined = Some(match combined {
            None => aligned,
            Some(mut acc) => {
                acc.vstack_mut(&aligned)?;
                acc
            }
        });
    }

    Ok(combined.unwrap_or_else(DataFrame::empty))
}

fn cast_all_to_string(df: DataFrame) -> Result<DataFrame> {
    let columns = df
        .get_columns()
        .iter()
        .map(|column| column.cast(&DataType::String))
        .collect::<PolarsResult<Vec<_>>>()?;
    Ok(DataFrame::new(columns)?)
}

/// Left-joins reviews onto products. Where both tables carry a column, the
/// product table's value wins. Rows without a `price_usd` are dropped.
pub fn merge_products_reviews(products: DataFrame, reviews: DataFrame) -> Result<DataFrame> {
    if products.column(columns::PRODUCT_ID).is_err() {
        return Err(PipelineError::missing_column(columns::PRODUCT_ID, "product table"));
    }
    if reviews.column(columns::PRODUCT_ID).is_err() {
        return Err(PipelineError::missing_column(columns::PRODUCT_ID, "review table"));
    }

    let merged = products
        .lazy()
        .join(
            reviews.lazy(),
            [col(columns::PRODUCT_ID)],
            [col(columns::PRODUCT_ID)],
            JoinArgs::new(JoinType::Left),
        )
        .collect()?;

    let duplicated: Vec<String> = merged
        .get_column_names()
        .iter()
        .filter(|name| name.ends_with(JOIN_SUFFIX))
        .map(|name| name.to_string())
        .collect();

    let mut merged = merged;
    for name in &duplicated {
        merged = merged.drop(name)?;
    }
    if !duplicated.is_empty() {
        debug!("Dropped review-side duplicate columns: {:?}", duplicated);
    }

    if merged.column(columns::PRICE_USD).is_err() {
        warn!("Merged table has no price_usd column");
        return Ok(merged);
    }

    let keep: Vec<bool> = string_values(&merged, columns::PRICE_USD)?
        .iter()
        .map(|price| non_blank(price.as_deref()).is_some())
        .collect();
    let before = merged.height();
    let merged = filter_rows(&merged, &keep)?;

    info!(
        "Merged table: {} rows x {} columns ({} rows without price dropped)",
        merged.height(),
        merged.width(),
        before - merged.height()
    );

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_read_csv_keeps_everything_as_strings() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "p.csv", "product_id,price_usd\nP1,20\nP2,\n");

        let df = read_csv(&dir.path().join("p.csv")).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("price_usd").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("price_usd").unwrap().null_count(), 1);
    }

    #[test]
    fn test_union_frames_aligns_columns() {
        let first = df!("product_id" => ["P1"], "rating" => ["5"]).unwrap();
        let second = df!("rating" => ["4"], "product_id" => ["P2"], "review_title" => ["ok"]).unwrap();

        let combined = union_frames(vec![first, second]).unwrap();
        assert_eq!(combined.height(), 2);
        assert_eq!(combined.width(), 3);

        let titles = string_values(&combined, "review_title").unwrap();
        assert_eq!(titles, vec![None, Some("ok".to_string())]);
        let ids = string_values(&combined, "product_id").unwrap();
        assert_eq!(ids, vec![Some("P1".to_string()), Some("P2".to_string())]);
    }

    #[test]
    fn test_union_of_nothing_is_empty() {
        assert_eq!(union_frames(Vec::new()).unwrap().height(), 0);
    }

    #[test]
    fn test_merge_prefers_product_columns_and_drops_unpriced() {
        let products = df!(
            "product_id" => ["P1", "P2", "P3"],
            "brand_name" => ["Glow Co", "Dew Lab", "No Price"],
            "price_usd" => [Some("20"), Some("35"), None]
        )
        .unwrap();
        let reviews = df!(
            "product_id" => ["P1", "P1", "P3"],
            "brand_name" => ["stale", "stale", "stale"],
            "rating" => ["5", "4", "3"]
        )
        .unwrap();

        let merged = merge_products_reviews(products, reviews).unwrap();

        // P1 twice, P2 once with no reviews, P3 dropped for missing price
        assert_eq!(merged.height(), 3);
        assert!(merged.column("brand_name_right").is_err());

        let brands = string_values(&merged, "brand_name").unwrap();
        assert!(brands.iter().all(|b| b.as_deref() != Some("stale")));

        let ratings = string_values(&merged, "rating").unwrap();
        assert_eq!(ratings.iter().filter(|r| r.is_none()).count(), 1);
    }

    #[test]
    fn test_merge_requires_join_key() {
        let products = df!("id" => ["P1"]).unwrap();
        let reviews = df!("product_id" => ["P1"]).unwrap();
        assert!(matches!(
            merge_products_reviews(products, reviews),
            Err(PipelineError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_load_merged_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "product_info.csv",
            "product_id,product_name,price_usd\nP1,Serum,20\nP2,Cream,15\n",
        );
        write(dir.path(), "reviews_0-250.csv", "product_id,rating\nP1,5\nP1,4\n");
        write(dir.path(), "reviews_250-500.csv", "product_id,rating,review_title\nP2,3,Fine\n");
        write(dir.path(), "notes.txt", "not a review file");

        let paths = PathsConfig {
            data_dir: dir.path().to_path_buf(),
            ..PathsConfig::default()
        };
        let loader = CsvLoader::new(paths);

        let files = loader.review_files().unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("reviews_0-250.csv"));

        let merged = loader.load_merged().unwrap();
        assert_eq!(merged.height(), 3);
        assert!(merged.column("review_title").is_ok());
    }

    #[test]
    fn test_missing_review_files() {
        let dir = tempfile::tempdir().unwrap();
        let loader = CsvLoader::new(PathsConfig {
            data_dir: dir.path().to_path_buf(),
            ..PathsConfig::default()
        });
        assert!(matches!(
            loader.review_files(),
            Err(PipelineError::NoInputFiles { .. })
        ));
    }
}
