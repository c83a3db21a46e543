//! Keyword rules: the fallback classifier that always answers.

use crate::assistant::core::intent::Intent;

/// Keyword sets in priority order. Multi-word entries match consecutive tokens.
pub const KEYWORD_RULES: [(Intent, &[&str]); 5] = [
    (
        Intent::SymptomCheck,
        &["symptom", "symptoms", "feel", "sick", "pain", "ache", "hurt"],
    ),
    (
        Intent::AppointmentScheduling,
        &["appointment", "schedule", "book", "visit", "see doctor"],
    ),
    (
        Intent::MedicationReminder,
        &["medication", "medicine", "pill", "drug", "reminder"],
    ),
    (
        Intent::HealthRecommendation,
        &["recommendation", "suggest", "advice", "healthy"],
    ),
    (
        Intent::MedicalRecordQuery,
        &["record", "history", "document", "test result"],
    ),
];

/// Lowercased whitespace tokens with surrounding punctuation trimmed.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|raw| {
            raw.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|token| !token.is_empty())
}

/// Classify by keyword overlap; `General` when no rule matches.
#[must_use]
pub fn classify_by_keywords(query: &str) -> Intent {
    let tokens: Vec<String> = tokenize(query).collect();

    KEYWORD_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| matches_keyword(&tokens, keyword)))
        .map_or(Intent::General, |(intent, _)| *intent)
}

fn matches_keyword(tokens: &[String], keyword: &str) -> bool {
    let words: Vec<&str> = keyword.split(' ').collect();
    if words.len() == 1 {
        return tokens.iter().any(|token| token == keyword);
    }
    tokens
        .windows(words.len())
        .any(|window| window.iter().zip(&words).all(|(token, word)| token == word))
}
