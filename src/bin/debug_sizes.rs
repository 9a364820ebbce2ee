use anyhow::{Context, Result};
use review_insights::config::PathsConfig;
use review_insights::loader::read_csv;
use review_insights::models::columns;
use review_insights::processor::UnitParser;
use review_insights::processor::frame_ops::string_values;
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;

fn main() -> Result<()> {
    println!("=== SIZE PARSING COVERAGE ===\n");

    let products_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathsConfig::default().products_path());

    let df = read_csv(&products_path)
        .with_context(|| format!("Failed to read {}", products_path.display()))?;
    println!("Loaded {} products from {}", df.height(), products_path.display());

    let sizes = string_values(&df, columns::SIZE)?;
    let parser = UnitParser::new();

    let mut per_unit: BTreeMap<&str, usize> = BTreeMap::new();
    let mut missing = 0;
    let mut unparsed = Vec::new();

    for size in &sizes {
        let Some(text) = size.as_deref() else {
            missing += 1;
            continue;
        };
        match parser.parse(Some(text)) {
            Some(parsed) => *per_unit.entry(parsed.unit.as_str()).or_default() += 1,
            None => unparsed.push(text.to_string()),
        }
    }

    println!("\nParsed by unit:");
    for (unit, count) in &per_unit {
        println!("   {:<6} {}", unit, count);
    }
    println!("   missing {}", missing);
    println!("   unparsed {}", unparsed.len());

    unparsed.sort();
    unparsed.dedup();
    println!("\nFirst unparsed sizes:");
    for text in unparsed.iter().take(20) {
        println!("   {:?}", text);
    }

    Ok(())
}
