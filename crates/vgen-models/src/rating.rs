//! Audio-sync quality ratings.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Qualitative band for a sync rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SyncLabel {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl SyncLabel {
    /// Band for a 0-100 rating.
    pub fn from_rating(rating: u8) -> Self {
        match rating {
            90..=100 => SyncLabel::Excellent,
            75..=89 => SyncLabel::Good,
            60..=74 => SyncLabel::Fair,
            _ => SyncLabel::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncLabel::Excellent => "excellent",
            SyncLabel::Good => "good",
            SyncLabel::Fair => "fair",
            SyncLabel::Poor => "poor",
        }
    }
}

impl fmt::Display for SyncLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measured timing metrics behind a rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SyncMetrics {
    /// Mean drift between expected and observed word timing, in milliseconds.
    pub mean_drift_ms: f64,
    /// Worst single-word drift, in milliseconds.
    pub max_drift_ms: f64,
    /// Fraction of expected words found within the drift tolerance.
    pub match_ratio: f64,
    /// Expected words with no acceptable observed counterpart.
    pub error_count: usize,
}

/// A 0-100 sync quality rating with its pass/fail verdict.
///
/// Produced fresh on every rating call; never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SyncRating {
    /// Composite rating, 0-100.
    pub rating: u8,
    /// Qualitative band for the rating.
    pub label: SyncLabel,
    /// True only when every configured threshold holds.
    pub passed: bool,
    /// The measured metrics the rating was computed from.
    pub metrics: SyncMetrics,
}

impl SyncRating {
    /// Build a rating from a composite score and metrics, deriving the label.
    pub fn new(rating: u8, passed: bool, metrics: SyncMetrics) -> Self {
        let rating = rating.min(100);
        Self {
            rating,
            label: SyncLabel::from_rating(rating),
            passed,
            metrics,
        }
    }
}
