//! End-to-end batch run: load, clean, export, report.

use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::loader::CsvLoader;
use crate::processor::{CleaningReport, DataCleaner, VaderScorer, SentimentScorer};
use crate::reporter::ReportBuilder;
use crate::storage::StorageManager;

pub const CLEAN_MERGED_FILE: &str = "clean_merged.csv";
pub const CLEANING_SUMMARY_FILE: &str = "cleaning_summary.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Cleaned table, summary and every report.
    Full,
    /// Cleaned table and summary only.
    CleanOnly,
}

#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub report: CleaningReport,
    pub files_written: Vec<PathBuf>,
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Pipeline { config }
    }

    pub fn run(&self, mode: RunMode) -> Result<PipelineSummary> {
        let scorer = VaderScorer::new();
        self.run_with_scorer(mode, &scorer)
    }

    pub fn run_with_scorer(
        &self,
        mode: RunMode,
        scorer: &dyn SentimentScorer,
    ) -> Result<PipelineSummary> {
        self.config.validate()?;

        info!(
            "Loading products from {} and reviews from {}",
            self.config.paths.products_path().display(),
            self.config.paths.data_dir.display()
        );
        let loader = CsvLoader::new(self.config.paths.clone());
        let merged = loader.load_merged()?;

        let cleaner = DataCleaner::new(self.config.cleaning.clone());
        let outcome = cleaner.clean(merged)?;
        let mut cleaned = outcome.data;

        let storage = StorageManager::new(&self.config.paths.output_dir);
        let mut files_written = Vec::new();
        files_written.push(storage.write_csv(CLEAN_MERGED_FILE, &mut cleaned)?);
        files_written.push(storage.write_json(CLEANING_SUMMARY_FILE, &outcome.report)?);

        match mode {
            RunMode::CleanOnly => {
                info!("Clean-only run, skipping reports");
            }
            RunMode::Full if !self.config.reporting.write_reports => {
                warn!("Report writing disabled in configuration");
            }
            RunMode::Full => {
                let builder = ReportBuilder::new(scorer, self.config.reporting.top_loved_products);
                for mut report in builder.build_all(&cleaned)? {
                    files_written.push(storage.write_csv(report.file_name, &mut report.data)?);
                }
            }
        }

        info!(
            "Wrote {} files to {}",
            files_written.len(),
            storage.output_dir().display()
        );

        Ok(PipelineSummary {
            report: outcome.report,
            files_written,
        })
    }
}
