//! Taggers that label records from keyword cues.

use crate::risk::RiskScorer;
use crate::sentiment::Sentiment;
use memoria_rs_memory::model::ROLE_USER;
use memoria_rs_memory::{Tagger, TaggerError};

pub const TAG_RISK_SEVERE: &str = "risk:severe";
pub const TAG_RISK_MODERATE: &str = "risk:moderate";
pub const TAG_PATTERN_CATASTROPHIZING: &str = "pattern:catastrophizing";
pub const TAG_PATTERN_RUMINATION: &str = "pattern:rumination";
pub const TAG_PATTERN_NEGATION: &str = "pattern:negation";

/// Labels user messages with the distress cues the risk scorer finds.
///
/// Only roles in the allow list are inspected, so assistant replies that
/// quote crisis resources are not flagged.
#[derive(Debug, Clone)]
pub struct RiskKeywordTagger {
    scorer: RiskScorer,
    roles: Vec<String>,
}

impl Default for RiskKeywordTagger {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskKeywordTagger {
    pub fn new() -> Self {
        Self {
            scorer: RiskScorer::new(),
            roles: vec![ROLE_USER.to_string()],
        }
    }

    /// Inspect records with any of the given roles instead of `user` only.
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }
}

impl Tagger for RiskKeywordTagger {
    fn name(&self) -> &str {
        "risk-keywords"
    }

    fn tag(&self, _user_id: &str, role: &str, content: &str) -> Result<Vec<String>, TaggerError> {
        if !self.roles.iter().any(|allowed| allowed == role) {
            return Ok(Vec::new());
        }
        let assessment = self.scorer.assess(content, &Sentiment::neutral(), "");
        let tags = [
            (assessment.severe, TAG_RISK_SEVERE),
            (assessment.moderate, TAG_RISK_MODERATE),
            (assessment.catastrophizing, TAG_PATTERN_CATASTROPHIZING),
            (assessment.rumination, TAG_PATTERN_RUMINATION),
            (assessment.negation, TAG_PATTERN_NEGATION),
        ]
        .into_iter()
        .filter(|(hit, _)| *hit)
        .map(|(_, tag)| tag.to_string())
        .collect();
        Ok(tags)
    }
}

/// Adds a tag whenever the content contains one of its keywords.
#[derive(Debug, Clone, Default)]
pub struct KeywordTagger {
    rules: Vec<(String, Vec<String>)>,
}

impl KeywordTagger {
    /// Build from `(tag, keywords)` pairs; matching ignores case.
    pub fn new<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        let rules = rules
            .into_iter()
            .map(|(tag, keywords)| {
                let keywords = keywords
                    .into_iter()
                    .map(|keyword| keyword.trim().to_lowercase())
                    .filter(|keyword| !keyword.is_empty())
                    .collect::<Vec<_>>();
                (tag, keywords)
            })
            .filter(|(tag, keywords)| !tag.trim().is_empty() && !keywords.is_empty())
            .collect();
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Tagger for KeywordTagger {
    fn name(&self) -> &str {
        "keywords"
    }

    fn tag(&self, _user_id: &str, _role: &str, content: &str) -> Result<Vec<String>, TaggerError> {
        let text = content.to_lowercase();
        Ok(self
            .rules
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|keyword| text.contains(keyword.as_str())))
            .map(|(tag, _)| tag.clone())
            .collect())
    }
}
