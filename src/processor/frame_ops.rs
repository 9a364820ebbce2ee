//! Row-level helpers over polars frames shared by the cleaner, normalizer and reporter.

use polars::prelude::*;
use std::collections::HashSet;
use std::hash::Hash;

use crate::error::Result;

/// Values of `name` rendered as strings. Fails if the column is missing.
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    let values = column
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect();
    Ok(values)
}

/// Like [`string_values`], but a missing column reads as all nulls.
pub fn optional_string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    if df.column(name).is_ok() {
        string_values(df, name)
    } else {
        Ok(vec![None; df.height()])
    }
}

pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

pub fn optional_f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    if df.column(name).is_ok() {
        f64_values(df, name)
    } else {
        Ok(vec![None; df.height()])
    }
}

/// Every row as a vector of string cells, used for whole-row comparisons.
pub fn row_keys(df: &DataFrame) -> Result<Vec<Vec<Option<String>>>> {
    let columns = df
        .get_columns()
        .iter()
        .map(|column| column.cast(&DataType::String))
        .collect::<PolarsResult<Vec<_>>>()?;

    let mut keys = vec![Vec::with_capacity(columns.len()); df.height()];
    for column in &columns {
        for (key, value) in keys.iter_mut().zip(column.str()?.into_iter()) {
            key.push(value.map(str::to_string));
        }
    }
    Ok(keys)
}

/// `true` for the first row carrying each key, `false` for later repeats.
pub fn first_occurrence_mask<K, I>(keys: I) -> Vec<bool>
where
    K: Hash + Eq,
    I: IntoIterator<Item = K>,
{
    let mut seen = HashSet::new();
    keys.into_iter().map(|key| seen.insert(key)).collect()
}

pub fn filter_rows(df: &DataFrame, keep: &[bool]) -> Result<DataFrame> {
    let mask = BooleanChunked::from_slice("keep".into(), keep);
    Ok(df.filter(&mask)?)
}

/// Blank or whitespace-only cells count as missing.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
