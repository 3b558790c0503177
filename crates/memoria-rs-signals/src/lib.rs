//! Keyword distress signals for conversation records.
//!
//! Scores a message on a 0..=10 scale from lexical cues and exposes taggers
//! that label records as they enter the memory store.

pub mod lexicon;
pub mod risk;
pub mod sentiment;
pub mod taggers;

/// Keyword expansion and built-in phrase tables.
pub use lexicon::expand_keywords;
/// Risk scoring.
pub use risk::{CRISIS_THRESHOLD, RiskAssessment, RiskScorer, context_from_records, risk_score};
/// Sentiment input model.
pub use sentiment::{Sentiment, SentimentLabel};
/// Taggers for the memory pipeline.
pub use taggers::{KeywordTagger, RiskKeywordTagger};
