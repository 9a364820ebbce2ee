use polars::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;

/// Writes pipeline outputs into a single flat output directory.
pub struct StorageManager {
    output_dir: PathBuf,
}

impl StorageManager {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        StorageManager {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    pub fn ensure_output_dir(&self) -> Result<()> {
        if !self.output_dir.exists() {
            fs::create_dir_all(&self.output_dir)?;
            info!("Created output directory: {}", self.output_dir.display());
        }
        Ok(())
    }

    /// Overwrites `file_name` if it already exists.
    pub fn write_csv(&self, file_name: &str, df: &mut DataFrame) -> Result<PathBuf> {
        self.ensure_output_dir()?;
        let path = self.path_for(file_name);
        let mut file = File::create(&path)?;
        CsvWriter::new(&mut file).include_header(true).finish(df)?;
        info!("Stored {} ({} rows)", path.display(), df.height());
        Ok(path)
    }

    pub fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> Result<PathBuf> {
        self.ensure_output_dir()?;
        let path = self.path_for(file_name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)?;
        info!("Stored {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_creates_nested_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path().join("out").join("reports"));
        storage.ensure_output_dir().unwrap();
        assert!(storage.output_dir().is_dir());
    }

    #[test]
    fn test_write_csv_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path());

        let mut first = df!("brand_name" => ["A", "B"], "n" => [1i64, 2]).unwrap();
        storage.write_csv("counts.csv", &mut first).unwrap();

        let mut second = df!("brand_name" => ["C"], "n" => [3i64]).unwrap();
        let path = storage.write_csv("counts.csv", &mut second).unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.starts_with("brand_name,n"));
        assert!(content.contains("C,3"));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageManager::new(dir.path());

        let path = storage
            .write_json("summary.json", &serde_json::json!({"rows_out": 42}))
            .unwrap();
        let parsed: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed["rows_out"], 42);
    }
}
