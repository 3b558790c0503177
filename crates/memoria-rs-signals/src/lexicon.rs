//! Phrase tables and the variant generator used to widen them.

use std::collections::BTreeSet;

/// Phrases that indicate acute risk.
pub const SEVERE_PHRASES: &[&str] = &[
    "suicide",
    "kill myself",
    "end my life",
    "want to die",
    "can't go on",
    "self harm",
    "harm myself",
    "cut myself",
    "no point living",
    "want to disappear",
];

/// Phrases that indicate hopelessness or self-criticism.
pub const MODERATE_PHRASES: &[&str] = &[
    "worthless",
    "failure",
    "hate myself",
    "don't care anymore",
    "nothing matters",
    "i give up",
    "i'm done",
    "no hope",
];

/// All-or-nothing thinking.
pub const CATASTROPHIZING_PATTERNS: &[&str] = &[
    r"\b(always|never|everyone|no one)\b.*(hate|fail|leave|hurt|abandon)",
    r"everything.*(ruined|broken|terrible|falling apart)",
];

/// Repetitive negative thought loops.
pub const RUMINATION_PATTERNS: &[&str] = &[
    r"i keep thinking",
    r"i can't stop thinking",
    r"over and over",
    r"my mind won't stop",
];

/// Negated positive states, matched as plain substrings.
pub const NEGATION_PHRASES: &[&str] = &[
    "not good",
    "not okay",
    "not fine",
    "don't feel right",
    "don't feel good",
];

/// Distress words counted for repetition.
pub const REPEATED_DISTRESS_PATTERN: &str = r"(sad|tired|hate|alone)";

/// Lower-cased phrases plus spacing, hyphen, plural, and tense variants.
///
/// "self harm" yields "selfharm", "self-harm" and "self harms"; a trailing
/// run of `s` is stripped for words that already end in one.
pub fn expand_keywords(words: &[&str]) -> Vec<String> {
    let mut expanded = BTreeSet::new();
    for word in words {
        let base = word.to_lowercase();
        expanded.insert(base.replace(' ', ""));
        expanded.insert(base.replace(' ', "-"));
        if base.ends_with('s') {
            expanded.insert(base.trim_end_matches('s').to_string());
        } else {
            expanded.insert(format!("{base}s"));
        }
        if let Some(stem) = base.strip_suffix("ing") {
            expanded.insert(stem.to_string());
        }
        if let Some(stem) = base.strip_suffix("ed") {
            expanded.insert(stem.to_string());
        }
        expanded.insert(base);
    }
    expanded.remove("");
    expanded.into_iter().collect()
}
