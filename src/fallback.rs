//! Keyword heuristic used when no trained model is available.
//!
//! Each keyword list entry that occurs as a substring of the lowercased text
//! adds one point to its class. Entries may repeat and phrases overlap with
//! single words ("terrible" and "terrible service" both score).

use crate::sentiment::{ModelSource, Prediction, Sentiment};

pub const POSITIVE_KEYWORDS: &[&str] = &[
    "good",
    "great",
    "excellent",
    "amazing",
    "wonderful",
    "fantastic",
    "love",
    "best",
    "perfect",
    "outstanding",
    "professional",
    "caring",
    "helpful",
    "clean",
    "modern",
    "knowledgeable",
    "effective",
    "satisfied",
    "recommend",
    "excellent",
];

pub const NEGATIVE_KEYWORDS: &[&str] = &[
    "bad",
    "terrible",
    "awful",
    "horrible",
    "worst",
    "hate",
    "disgusting",
    "poor",
    "disappointing",
    "useless",
    "rude",
    "long wait",
    "ineffective",
    "terrible service",
    "worst experience",
    "unprofessional",
    "dirty",
    "old",
    "broken",
    "expensive",
];

pub const NEUTRAL_KEYWORDS: &[&str] = &[
    "okay",
    "fine",
    "average",
    "normal",
    "standard",
    "regular",
    "usual",
    "typical",
    "adequate",
    "acceptable",
];

/// Texts without any keyword that mention one of these lean positive.
pub const DOMAIN_KEYWORDS: &[&str] = &["doctor", "hospital", "medical", "treatment", "care"];

const SHORT_TEXT_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeywordScores {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl KeywordScores {
    pub fn of(text: &str) -> Self {
        let lower = text.to_lowercase();
        let hits = |keywords: &[&str]| keywords.iter().filter(|k| lower.contains(*k)).count();
        Self {
            positive: hits(POSITIVE_KEYWORDS),
            negative: hits(NEGATIVE_KEYWORDS),
            neutral: hits(NEUTRAL_KEYWORDS),
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

/// Scores `text` with the keyword lists. Never fails.
///
/// Positive wins only with a strictly higher count than both other classes,
/// then negative likewise; every other outcome, ties included, is neutral.
pub fn keyword_sentiment(text: &str) -> Prediction {
    let scores = KeywordScores::of(text);

    let (sentiment, confidence) = if scores.total() == 0 {
        no_keyword_sentiment(text)
    } else if scores.positive > scores.negative && scores.positive > scores.neutral {
        (
            Sentiment::Positive,
            f64::min(0.95, 0.6 + scores.positive as f64 * 0.1),
        )
    } else if scores.negative > scores.positive && scores.negative > scores.neutral {
        (
            Sentiment::Negative,
            f64::min(0.95, 0.6 + scores.negative as f64 * 0.1),
        )
    } else {
        (
            Sentiment::Neutral,
            f64::min(0.85, 0.5 + scores.neutral as f64 * 0.05),
        )
    };

    Prediction::new(sentiment, confidence, ModelSource::KeywordFallback)
}

fn no_keyword_sentiment(text: &str) -> (Sentiment, f64) {
    if text.chars().count() < SHORT_TEXT_CHARS {
        return (Sentiment::Neutral, 0.5);
    }
    let lower = text.to_lowercase();
    if DOMAIN_KEYWORDS.iter().any(|k| lower.contains(k)) {
        (Sentiment::Positive, 0.6)
    } else {
        (Sentiment::Neutral, 0.5)
    }
}
