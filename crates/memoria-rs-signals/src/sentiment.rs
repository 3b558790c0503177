//! Sentiment classification handed to the risk scorer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Polarity reported by an upstream classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl SentimentLabel {
    /// Map a classifier label; anything unrecognized is neutral.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "POSITIVE" => Self::Positive,
            "NEGATIVE" => Self::Negative,
            _ => Self::Neutral,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Positive => f.write_str("POSITIVE"),
            Self::Negative => f.write_str("NEGATIVE"),
            Self::Neutral => f.write_str("NEUTRAL"),
        }
    }
}

/// Label plus classifier confidence in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Sentiment {
    #[serde(default)]
    pub label: SentimentLabel,
    #[serde(default)]
    pub score: f32,
}

impl Sentiment {
    pub fn new(label: SentimentLabel, score: f32) -> Self {
        Self { label, score }
    }

    /// Neutral sentiment with zero confidence.
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Confidence clamped to `0.0..=1.0`; NaN counts as zero.
    pub fn confidence(&self) -> f32 {
        if self.score.is_nan() {
            0.0
        } else {
            self.score.clamp(0.0, 1.0)
        }
    }
}
