use regex::Regex;
use std::sync::LazyLock;

use crate::models::CanonicalUnit;

/// Unit token -> (canonical unit, conversion factor).
const UNIT_TABLE: &[(&str, CanonicalUnit, f64)] = &[
    ("ml", CanonicalUnit::Ml, 1.0),
    ("g", CanonicalUnit::G, 1.0),
    ("mg", CanonicalUnit::G, 0.001),
    ("fl oz", CanonicalUnit::Ml, 29.5735),
    ("oz", CanonicalUnit::Ml, 29.5735),
    ("pcs", CanonicalUnit::Count, 1.0),
    ("count", CanonicalUnit::Count, 1.0),
];

/// When a size string names several units, the first of these that appears wins.
const UNIT_PRIORITY: &[&str] = &["ml", "g", "mg", "fl oz", "oz", "pcs", "count"];

// Alternation order matters: "fl oz" before "oz", "ml"/"mg" before "g".
static SIZE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?|\.\d+)\s*(fl\.?\s*oz|ml|mg|oz|g|pcs|count)\b")
        .expect("size pattern is a valid regex")
});

/// A quantity expressed in a canonical unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedSize {
    pub quantity: f64,
    pub unit: CanonicalUnit,
}

impl ParsedSize {
    /// Price per 100 ml or 100 g. Count-based sizes have no such metric.
    pub fn price_per_100(&self, price: f64) -> Option<f64> {
        if self.unit.is_measurable() && self.quantity > 0.0 {
            Some(price / self.quantity * 100.0)
        } else {
            None
        }
    }
}

/// Extracts a package size from free text such as `"2 oz/ 60 mL"` or `"3 pcs"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitParser;

impl UnitParser {
    pub fn new() -> Self {
        UnitParser
    }

    pub fn parse(&self, text: Option<&str>) -> Option<ParsedSize> {
        let text = text?.trim();
        if text.is_empty() {
            return None;
        }

        let lowered = text.to_lowercase();
        let candidates: Vec<(String, f64)> = SIZE_PATTERN
            .captures_iter(&lowered)
            .filter_map(|caps| {
                let value = caps.get(1)?.as_str().parse::<f64>().ok()?;
                let token = normalize_token(caps.get(2)?.as_str());
                Some((token, value))
            })
            .collect();

        if candidates.is_empty() {
            return None;
        }

        let (token, value) = UNIT_PRIORITY.iter().find_map(|unit| {
            candidates
                .iter()
                .find(|(token, _)| token == unit)
                .map(|(token, value)| (token.as_str(), *value))
        })?;

        let (_, unit, factor) = UNIT_TABLE.iter().find(|(name, _, _)| *name == token)?;

        Some(ParsedSize {
            quantity: value * factor,
            unit: *unit,
        })
    }
}

/// "fl.  oz" -> "fl oz"
fn normalize_token(token: &str) -> String {
    token
        .replace('.', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
