use vader_sentiment::SentimentIntensityAnalyzer;

use crate::models::SentimentLabel;

/// Polarity scoring for short texts such as review titles.
///
/// Implementations return a compound score in `[-1, 1]`.
pub trait SentimentScorer {
    fn score(&self, text: &str) -> f64;

    fn label(&self, text: &str) -> SentimentLabel {
        SentimentLabel::from_compound(self.score(text))
    }
}

/// VADER compound score.
pub struct VaderScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderScorer {
    pub fn new() -> Self {
        VaderScorer {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer for VaderScorer {
    fn score(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }
        let scores = self.analyzer.polarity_scores(text);
        scores.get("compound").copied().unwrap_or(0.0)
    }
}
