use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const NUM_CLASSES: usize = 3;

/// Sentiment label. The discriminants are the label codes used in training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative = 0,
    Positive = 1,
    Neutral = 2,
}

impl Sentiment {
    pub const ALL: [Sentiment; NUM_CLASSES] =
        [Sentiment::Negative, Sentiment::Positive, Sentiment::Neutral];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Negative => "negative",
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "negative" => Ok(Sentiment::Negative),
            "positive" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            other => Err(format!("unknown sentiment '{other}'")),
        }
    }
}

/// A labeled review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub text: String,
    pub sentiment: Sentiment,
}

impl Review {
    pub fn new(text: impl Into<String>, sentiment: Sentiment) -> Self {
        Self {
            text: text.into(),
            sentiment,
        }
    }
}

/// Per-class posterior probabilities, indexed by [`Sentiment::index`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Posterior(pub [f64; NUM_CLASSES]);

impl Posterior {
    pub fn get(&self, sentiment: Sentiment) -> f64 {
        self.0[sentiment.index()]
    }

    /// Most probable class and its probability. Ties go to the lowest label code.
    pub fn best(&self) -> (Sentiment, f64) {
        let mut best = 0;
        for i in 1..NUM_CLASSES {
            if self.0[i] > self.0[best] {
                best = i;
            }
        }
        (Sentiment::ALL[best], self.0[best])
    }

    /// Normalises raw log scores into probabilities (log-sum-exp).
    pub fn from_log_scores(scores: [f64; NUM_CLASSES]) -> Self {
        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return Posterior([1.0 / NUM_CLASSES as f64; NUM_CLASSES]);
        }
        let mut probs = [0.0; NUM_CLASSES];
        let mut sum = 0.0;
        for (p, &s) in probs.iter_mut().zip(scores.iter()) {
            *p = (s - max).exp();
            sum += *p;
        }
        for p in probs.iter_mut() {
            *p /= sum;
        }
        Posterior(probs)
    }
}

/// Which scoring path produced a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    TrainedModel,
    KeywordFallback,
}

impl ModelSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelSource::TrainedModel => "trained_model",
            ModelSource::KeywordFallback => "keyword_fallback",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub sentiment: Sentiment,
    /// Always in `[0, 1]`.
    pub confidence: f64,
    pub source: ModelSource,
}

impl Prediction {
    pub fn new(sentiment: Sentiment, confidence: f64, source: ModelSource) -> Self {
        Self {
            sentiment,
            confidence: if confidence.is_nan() {
                0.0
            } else {
                confidence.clamp(0.0, 1.0)
            },
            source,
        }
    }
}
