//! Text normalisation
//!
//! Turns raw review text into a sequence of content tokens. All modes
//! lowercase, replace anything outside `[a-zA-Z\s]` with whitespace and split
//! on whitespace. They differ in the stopword list, the minimum token length
//! and how tokens are reduced toward a root form:
//!
//! - [`NormalizerMode::Simple`]: a short fixed stopword list and crude
//!   suffix stripping (`ing`, `ed`, `er`, `ly`) on tokens longer than four
//!   characters.
//! - [`NormalizerMode::Standard`]: the NLTK English stopword list, tokens of
//!   two characters or fewer dropped, no root reduction.
//! - [`NormalizerMode::Enhanced`]: as `Standard`, plus Snowball stemming.
//!
//! Reduction is applied until the token stops changing and the filters run
//! again afterwards, so normalising already normalised text is a no-op.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use stop_words::LANGUAGE;

static NON_ALPHA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z\s]").unwrap());

const SIMPLE_STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "will", "with", "i", "me", "my", "we", "you",
    "your",
];

const CRUDE_SUFFIXES: &[&str] = &["ing", "ed", "er", "ly"];


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizerMode {
    Simple,
    #[default]
    Standard,
    Enhanced,
}

impl NormalizerMode {
    fn default_min_len(self) -> usize {
        match self {
            NormalizerMode::Simple => 1,
            NormalizerMode::Standard | NormalizerMode::Enhanced => 3,
        }
    }
}

impl fmt::Display for NormalizerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NormalizerMode::Simple => "simple",
            NormalizerMode::Standard => "standard",
            NormalizerMode::Enhanced => "enhanced",
        })
    }
}

impl FromStr for NormalizerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple" => Ok(NormalizerMode::Simple),
            "standard" => Ok(NormalizerMode::Standard),
            "enhanced" => Ok(NormalizerMode::Enhanced),
            other => Err(format!("unknown normalizer mode '{other}'")),
        }
    }
}

/// Persisted alongside the vectorizer so inference normalises exactly like training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub mode: NormalizerMode,
    /// Tokens shorter than this are dropped.
    pub min_len: usize,
}

impl TokenizerConfig {
    pub fn new(mode: NormalizerMode) -> Self {
        Self {
            mode,
            min_len: mode.default_min_len(),
        }
    }
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self::new(NormalizerMode::default())
    }
}

pub struct Tokenizer {
    config: TokenizerConfig,
    stopwords: HashSet<String>,
    stemmer: Option<Stemmer>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Tokenizer::new(TokenizerConfig::default())
    }
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        let stopwords = match config.mode {
            NormalizerMode::Simple => SIMPLE_STOPWORDS.iter().map(|w| w.to_string()).collect(),
            NormalizerMode::Standard | NormalizerMode::Enhanced => stop_words::get(LANGUAGE::English)
                .iter()
                .map(|w| w.to_string())
                .collect(),
        };
        let stemmer = match config.mode {
            NormalizerMode::Enhanced => Some(Stemmer::create(Algorithm::English)),
            _ => None,
        };

        Tokenizer {
            config,
            stopwords,
            stemmer,
        }
    }

    pub fn config(&self) -> TokenizerConfig {
        self.config
    }

    fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }

    /// Normalises `text` into content tokens. Never fails; text without any
    /// surviving token yields an empty vector.
    pub fn normalize(&self, text: &str) -> Vec<String> {
        let text = text.to_lowercase();
        let text = NON_ALPHA.replace_all(&text, " ");

        text.split_whitespace()
            .filter(|token| !self.is_stopword(token))
            .map(|token| self.reduce(token))
            .filter(|token| token.len() >= self.config.min_len && !self.is_stopword(token))
            .collect()
    }

    /// Normalised tokens rejoined with single spaces.
    pub fn normalize_to_string(&self, text: &str) -> String {
        self.normalize(text).join(" ")
    }

    fn reduce(&self, token: &str) -> String {
        match self.config.mode {
            NormalizerMode::Simple => crude_stem(token).to_string(),
            NormalizerMode::Standard => token.to_string(),
            NormalizerMode::Enhanced => match &self.stemmer {
                Some(stemmer) => {
                    // Snowball never lengthens a word; a repeated form ends the loop
                    let mut current = token.to_string();
                    let mut seen = HashSet::new();
                    loop {
                        let next = stemmer.stem(&current).into_owned();
                        if next == current || !seen.insert(current) {
                            break next;
                        }
                        current = next;
                    }
                }
                None => token.to_string(),
            },
        }
    }
}

/// Strips `ing`/`ed`/`er`/`ly` from tokens longer than four characters,
/// repeating while the rule still applies.
pub fn crude_stem(token: &str) -> &str {
    let mut current = token;
    'outer: while current.len() > 4 {
        for suffix in CRUDE_SUFFIXES {
            if let Some(stripped) = current.strip_suffix(suffix) {
                current = stripped;
                continue 'outer;
            }
        }
        break;
    }
    current
}
