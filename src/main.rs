use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use review_insights::processor::UnitParser;
use review_insights::{Pipeline, PipelineConfig, RunMode};
use std::path::{Path, PathBuf};
use tracing::{Level, info, warn};

const DEFAULT_CONFIG_PATH: &str = "src/configs/pipeline.toml";

/// Clean merged product reviews and build brand, category, price and sentiment reports
#[derive(Debug, Parser)]
#[command(name = "review-insights", version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Pipeline configuration file (defaults to src/configs/pipeline.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory holding product_info.csv and the reviews_*.csv parts
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Directory the cleaned table and reports are written to
    #[arg(long, global = true, value_name = "PATH")]
    output_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load, clean, and write the cleaned table plus every report
    Run,
    /// Load and clean, writing only the cleaned table and its summary
    Clean,
    /// Print the parsed quantity and unit for each size string
    ParseSize {
        #[arg(required = true)]
        text: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    dotenv::dotenv().ok();

    match &args.command {
        Command::ParseSize { text } => {
            parse_sizes(text);
            Ok(())
        }
        Command::Run => run_pipeline(&args, RunMode::Full),
        Command::Clean => run_pipeline(&args, RunMode::CleanOnly),
    }
}

fn load_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            PipelineConfig::from_file(DEFAULT_CONFIG_PATH)
                .context("Failed to load default pipeline configuration")?
        }
        None => {
            warn!("No configuration file found, using built-in defaults");
            PipelineConfig::default()
        }
    };

    config.apply_env_overrides();

    if let Some(data_dir) = &args.data_dir {
        config.paths.data_dir = data_dir.clone();
    }
    if let Some(output_dir) = &args.output_dir {
        config.paths.output_dir = output_dir.clone();
    }

    Ok(config)
}

fn run_pipeline(args: &Args, mode: RunMode) -> Result<()> {
    let config = load_config(args)?;

    info!("🚀 Starting review pipeline ({:?})", mode);
    info!(
        "Data: {} | Output: {}",
        config.paths.data_dir.display(),
        config.paths.output_dir.display()
    );

    let pipeline = Pipeline::new(config);
    let summary = pipeline
        .run(mode)
        .context("Review pipeline failed")?;

    info!("📊 {}", summary.report.summary());
    for path in &summary.files_written {
        info!("  {}", path.display());
    }
    info!("✅ Pipeline completed successfully");

    Ok(())
}

fn parse_sizes(texts: &[String]) {
    let parser = UnitParser::new();
    for text in texts {
        match parser.parse(Some(text.as_str())) {
            Some(size) => println!("{:<30} -> {} {}", text, size.quantity, size.unit),
            None => println!("{:<30} -> (no size)", text),
        }
    }
}
