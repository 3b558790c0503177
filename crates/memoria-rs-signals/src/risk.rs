//! Distress scoring over a message, its sentiment, and recent history.

use crate::lexicon::{
    CATASTROPHIZING_PATTERNS, MODERATE_PHRASES, NEGATION_PHRASES, REPEATED_DISTRESS_PATTERN,
    RUMINATION_PATTERNS, SEVERE_PHRASES, expand_keywords,
};
use crate::sentiment::{Sentiment, SentimentLabel};
use log::warn;
use memoria_rs_memory::MemoryRecord;
use regex::Regex;
use std::sync::LazyLock;

/// Highest possible score.
pub const MAX_RISK: u8 = 10;
/// Scores at or above this warrant a crisis response.
pub const CRISIS_THRESHOLD: u8 = 8;

const SEVERE_WEIGHT: i32 = 6;
const SEVERE_CONTEXT_WEIGHT: i32 = 2;
const MODERATE_WEIGHT: i32 = 3;
const MODERATE_CONTEXT_WEIGHT: i32 = 1;
const PATTERN_WEIGHT: i32 = 2;
const SHORT_MESSAGE_CHARS: usize = 5;
const LONG_MESSAGE_CHARS: usize = 500;

static DEFAULT_SCORER: LazyLock<RiskScorer> = LazyLock::new(RiskScorer::new);

/// Breakdown of a single scoring pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RiskAssessment {
    /// Clamped score in `0..=10`.
    pub score: u8,
    /// At least one severe phrase appeared in the message.
    pub severe: bool,
    /// At least one moderate phrase appeared in the message.
    pub moderate: bool,
    /// Catastrophizing pattern matched.
    pub catastrophizing: bool,
    /// Rumination pattern matched.
    pub rumination: bool,
    /// Negated positive state found.
    pub negation: bool,
}

impl RiskAssessment {
    /// Severe phrase present or score at the crisis threshold.
    pub fn is_crisis(&self) -> bool {
        self.severe || self.score >= CRISIS_THRESHOLD
    }
}

/// Compiled phrase tables.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    severe: Vec<String>,
    moderate: Vec<String>,
    catastrophizing: Vec<Regex>,
    rumination: Vec<Regex>,
    repeated_distress: Option<Regex>,
    shouting: Option<Regex>,
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskScorer {
    /// Build the scorer from the built-in tables.
    pub fn new() -> Self {
        Self {
            severe: expand_keywords(SEVERE_PHRASES),
            moderate: expand_keywords(MODERATE_PHRASES),
            catastrophizing: compile_all(CATASTROPHIZING_PATTERNS),
            rumination: compile_all(RUMINATION_PATTERNS),
            repeated_distress: compile(REPEATED_DISTRESS_PATTERN),
            shouting: compile(r"\b[A-Z]{3,}\b"),
        }
    }

    /// Severe phrases after expansion.
    pub fn severe_keywords(&self) -> &[String] {
        &self.severe
    }

    /// Moderate phrases after expansion.
    pub fn moderate_keywords(&self) -> &[String] {
        &self.moderate
    }

    /// Score `message` given its sentiment and the joined recent history.
    pub fn assess(&self, message: &str, sentiment: &Sentiment, context: &str) -> RiskAssessment {
        let text = message.to_lowercase();
        let context = context.to_lowercase();
        let mut assessment = RiskAssessment::default();
        let mut risk: i32 = 0;

        risk += match sentiment.label {
            SentimentLabel::Negative => (sentiment.confidence() * 4.0) as i32,
            SentimentLabel::Neutral => 0,
            SentimentLabel::Positive => -1,
        };

        let severe_hits = count_hits(&self.severe, &text);
        assessment.severe = severe_hits > 0;
        risk += SEVERE_WEIGHT * severe_hits;
        if any_hit(&self.severe, &context) {
            risk += SEVERE_CONTEXT_WEIGHT;
        }

        let moderate_hits = count_hits(&self.moderate, &text);
        assessment.moderate = moderate_hits > 0;
        risk += MODERATE_WEIGHT * moderate_hits;
        if any_hit(&self.moderate, &context) {
            risk += MODERATE_CONTEXT_WEIGHT;
        }

        let catastrophizing = count_matches(&self.catastrophizing, &text);
        assessment.catastrophizing = catastrophizing > 0;
        risk += PATTERN_WEIGHT * catastrophizing;

        let rumination = count_matches(&self.rumination, &text);
        assessment.rumination = rumination > 0;
        risk += PATTERN_WEIGHT * rumination;

        let negations = NEGATION_PHRASES
            .iter()
            .filter(|phrase| text.contains(*phrase))
            .count() as i32;
        assessment.negation = negations > 0;
        risk += negations;

        risk += structural_signals(self, message, &text);

        assessment.score = risk.clamp(0, i32::from(MAX_RISK)) as u8;
        assessment
    }
}

/// Message-shape cues: exclamation runs, shouting, length, repeated distress words.
fn structural_signals(scorer: &RiskScorer, message: &str, text: &str) -> i32 {
    let mut risk = 0;
    if text.matches('!').count() >= 3 {
        risk += 1;
    }
    let shouted = scorer
        .shouting
        .as_ref()
        .map_or(0, |regex| regex.find_iter(message).count());
    if shouted >= 2 {
        risk += 1;
    }
    let chars = message.chars().count();
    if chars < SHORT_MESSAGE_CHARS {
        risk += 1;
    }
    if chars > LONG_MESSAGE_CHARS {
        risk += 1;
    }
    let repeated = scorer
        .repeated_distress
        .as_ref()
        .map_or(0, |regex| regex.find_iter(text).count());
    if repeated >= 3 {
        risk += 1;
    }
    risk
}

/// Score a message with the built-in tables.
pub fn risk_score(message: &str, sentiment: &Sentiment, context: &str) -> u8 {
    DEFAULT_SCORER.assess(message, sentiment, context).score
}

/// Full breakdown with the built-in tables.
pub fn assess(message: &str, sentiment: &Sentiment, context: &str) -> RiskAssessment {
    DEFAULT_SCORER.assess(message, sentiment, context)
}

/// Join record contents, one per line, in the order given.
pub fn context_from_records(records: &[MemoryRecord]) -> String {
    records
        .iter()
        .map(|record| record.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn count_hits(keywords: &[String], text: &str) -> i32 {
    keywords
        .iter()
        .filter(|keyword| text.contains(keyword.as_str()))
        .count() as i32
}

fn any_hit(keywords: &[String], text: &str) -> bool {
    !text.is_empty() && keywords.iter().any(|keyword| text.contains(keyword.as_str()))
}

fn count_matches(patterns: &[Regex], text: &str) -> i32 {
    patterns.iter().filter(|regex| regex.is_match(text)).count() as i32
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(err) => {
            warn!("skipping risk pattern (pattern={pattern}): {err}");
            None
        }
    }
}

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|pattern| compile(pattern)).collect()
}

#[cfg(test)]
mod tests {
    use super::{RiskScorer, context_from_records, risk_score};
    use crate::sentiment::{Sentiment, SentimentLabel};
    use memoria_rs_memory::MemoryRecord;
    use pretty_assertions::assert_eq;

    fn neutral() -> Sentiment {
        Sentiment::neutral()
    }

    #[test]
    fn keyword_tables_include_generated_variants() {
        let scorer = RiskScorer::new();
        for variant in ["kill myself", "killmyself", "kill-myself"] {
            assert!(scorer.severe_keywords().iter().any(|keyword| keyword == variant));
        }
        assert!(scorer.moderate_keywords().iter().any(|keyword| keyword == "failures"));
        assert!(!scorer.moderate_keywords().iter().any(|keyword| keyword == "suicide"));
    }

    #[test]
    fn calm_message_scores_zero() {
        assert_eq!(risk_score("Had a lovely walk in the park today", &neutral(), ""), 0);
    }

    #[test]
    fn positive_sentiment_never_goes_negative() {
        let positive = Sentiment::new(SentimentLabel::Positive, 0.99);
        assert_eq!(risk_score("Great news about the new job", &positive, ""), 0);
    }

    #[test]
    fn negative_sentiment_scales_with_confidence() {
        let negative = Sentiment::new(SentimentLabel::Negative, 0.9);
        assert_eq!(risk_score("the bus was late again", &negative, ""), 3);
    }

    #[test]
    fn severe_phrase_dominates() {
        let assessment =
            RiskScorer::new().assess("Sometimes I want to die", &neutral(), "");
        assert!(assessment.severe);
        assert!(assessment.score >= 6);
        assert!(assessment.is_crisis());
    }

    #[test]
    fn score_is_clamped() {
        let negative = Sentiment::new(SentimentLabel::Negative, 1.0);
        let message = "I hate myself, I feel worthless, I want to die and I can't go on!!!";
        assert_eq!(risk_score(message, &negative, "suicide"), 10);
    }

    #[test]
    fn context_echo_raises_score() {
        let base = risk_score("just checking in", &neutral(), "");
        let echoed = risk_score("just checking in", &neutral(), "I felt worthless yesterday");
        assert_eq!(echoed, base + 1);
    }

    #[test]
    fn detects_linguistic_patterns() {
        let assessment = RiskScorer::new().assess(
            "I keep thinking everyone will leave me and everything is ruined",
            &neutral(),
            "",
        );
        assert!(assessment.rumination);
        assert!(assessment.catastrophizing);
        assert_eq!(assessment.score, 6);
    }

    #[test]
    fn short_and_shouted_messages_add_points() {
        assert_eq!(risk_score("ok", &neutral(), ""), 1);
        assert_eq!(risk_score("WHY does NOBODY listen", &neutral(), ""), 1);
    }

    #[test]
    fn joins_context_in_order() {
        let records = vec![
            MemoryRecord::new("u1", "user", "first", Vec::new()),
            MemoryRecord::new("u1", "assistant", "second", Vec::new()),
        ];
        assert_eq!(context_from_records(&records), "first\nsecond");
    }
}
