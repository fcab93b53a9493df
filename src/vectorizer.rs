//! TF-IDF vectorisation
//!
//! [`TfidfVectorizer::fit`] scans a corpus of normalised documents and
//! freezes a [`Vocabulary`] of word n-grams together with their smoothed
//! inverse document frequencies. A fitted vectorizer only ever transforms:
//! n-grams outside the vocabulary are ignored and the vocabulary never grows.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SentimentError};
use crate::tokenizer::TokenizerConfig;

/// Sparse feature vector with strictly increasing indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    dim: usize,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseVector {
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Builds a vector from `(index, value)` pairs. Zero values are dropped;
    /// indices must be below `dim`.
    pub fn from_pairs(dim: usize, pairs: impl IntoIterator<Item = (usize, f64)>) -> Result<Self> {
        let mut sorted = BTreeMap::new();
        for (index, value) in pairs {
            if index >= dim {
                return Err(SentimentError::DimensionMismatch {
                    expected: dim,
                    actual: index + 1,
                });
            }
            *sorted.entry(index).or_insert(0.0) += value;
        }
        let (indices, values) = sorted.into_iter().filter(|(_, v)| *v != 0.0).unzip();
        Ok(Self {
            dim,
            indices,
            values,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

/// Frozen n-gram to feature index mapping. Serialised as its ordered term
/// list; the lookup index is rebuilt on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    terms: Vec<String>,
    index: HashMap<String, usize>,
}

impl From<Vec<String>> for Vocabulary {
    fn from(terms: Vec<String>) -> Self {
        Self::from_terms(terms)
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocabulary: Vocabulary) -> Self {
        vocabulary.terms
    }
}

impl Vocabulary {
    /// `terms` must be unique; indices follow their order.
    fn from_terms(terms: Vec<String>) -> Self {
        let index = terms
            .iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), i))
            .collect();
        Self { terms, index }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn get(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizerConfig {
    /// Keep at most this many n-grams, ranked by corpus frequency.
    pub max_features: Option<usize>,
    /// Inclusive n-gram size range.
    pub ngram_range: (usize, usize),
    /// Minimum number of documents an n-gram must appear in.
    pub min_df: usize,
    /// Maximum fraction of documents an n-gram may appear in.
    pub max_df: f64,
    pub sublinear_tf: bool,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_features: Some(15_000),
            ngram_range: (1, 3),
            min_df: 1,
            max_df: 0.95,
            sublinear_tf: true,
        }
    }
}

impl VectorizerConfig {
    fn validate(&self) -> Result<()> {
        let (lo, hi) = self.ngram_range;
        if lo == 0 || lo > hi {
            return Err(SentimentError::InvalidParameter {
                name: "ngram_range".to_string(),
                value: format!("({lo}, {hi})"),
                reason: "expected 1 <= min <= max".to_string(),
            });
        }
        if !(self.max_df > 0.0 && self.max_df <= 1.0) {
            return Err(SentimentError::InvalidParameter {
                name: "max_df".to_string(),
                value: self.max_df.to_string(),
                reason: "expected a fraction in (0, 1]".to_string(),
            });
        }
        Ok(())
    }

    fn ngrams<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<String> {
        let (lo, hi) = self.ngram_range;
        let mut grams = Vec::new();
        for n in lo..=hi {
            for window in tokens.windows(n) {
                let gram = window
                    .iter()
                    .map(AsRef::as_ref)
                    .collect::<Vec<&str>>()
                    .join(" ");
                grams.push(gram);
            }
        }
        grams
    }
}

/// A fitted TF-IDF vectorizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: VectorizerConfig,
    tokenizer: TokenizerConfig,
    vocabulary: Vocabulary,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Fits the vocabulary and idf weights. `tokenizer` records how the
    /// documents were normalised so inference can do the same.
    pub fn fit<S: AsRef<str>>(
        config: VectorizerConfig,
        tokenizer: TokenizerConfig,
        documents: &[Vec<S>],
    ) -> Result<Self> {
        config.validate()?;
        if documents.is_empty() {
            return Err(SentimentError::EmptyTrainingSet);
        }

        let n_docs = documents.len();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut term_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let mut counts: HashMap<String, usize> = HashMap::new();
            for gram in config.ngrams(doc) {
                *counts.entry(gram).or_insert(0) += 1;
            }
            for (gram, count) in counts {
                *term_freq.entry(gram.clone()).or_insert(0) += count;
                *doc_freq.entry(gram).or_insert(0) += 1;
            }
        }

        let max_doc_count = config.max_df * n_docs as f64;
        let mut candidates: Vec<(String, usize)> = term_freq
            .into_iter()
            .filter(|(term, _)| {
                let df = doc_freq[term];
                df >= config.min_df && df as f64 <= max_doc_count
            })
            .collect();

        if candidates.is_empty() {
            return Err(SentimentError::EmptyVocabulary);
        }

        if let Some(limit) = config.max_features {
            // most frequent first, lexical order on ties
            candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            candidates.truncate(limit);
        }

        let mut terms: Vec<String> = candidates.into_iter().map(|(term, _)| term).collect();
        terms.sort();

        let idf = terms
            .iter()
            .map(|term| smoothed_idf(n_docs, doc_freq[term]))
            .collect();

        debug!(
            documents = n_docs,
            features = terms.len(),
            "Fitted TF-IDF vocabulary"
        );

        Ok(Self {
            config,
            tokenizer,
            vocabulary: Vocabulary::from_terms(terms),
            idf,
        })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }

    pub fn tokenizer_config(&self) -> TokenizerConfig {
        self.tokenizer
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    /// Rejects a decoded vectorizer whose idf weights or term index do not
    /// line up with its vocabulary.
    pub fn check_consistency(&self) -> Result<()> {
        if self.idf.len() != self.vocabulary.len() {
            return Err(SentimentError::DimensionMismatch {
                expected: self.vocabulary.len(),
                actual: self.idf.len(),
            });
        }
        if self.vocabulary.index.len() != self.vocabulary.len() {
            return Err(SentimentError::InvalidParameter {
                name: "vocabulary".to_string(),
                value: format!("{} terms", self.vocabulary.len()),
                reason: "terms must be unique".to_string(),
            });
        }
        if self.idf.iter().any(|w| !w.is_finite()) {
            return Err(SentimentError::InvalidParameter {
                name: "idf".to_string(),
                value: format!("{} weights", self.idf.len()),
                reason: "weights must be finite".to_string(),
            });
        }
        Ok(())
    }

    /// Vectorises one normalised document with the frozen vocabulary.
    pub fn transform<S: AsRef<str>>(&self, tokens: &[S]) -> SparseVector {
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for gram in self.config.ngrams(tokens) {
            if let Some(index) = self.vocabulary.get(&gram) {
                *counts.entry(index).or_insert(0) += 1;
            }
        }

        let mut indices = Vec::with_capacity(counts.len());
        let mut values = Vec::with_capacity(counts.len());
        for (index, count) in counts {
            let tf = if self.config.sublinear_tf {
                1.0 + (count as f64).ln()
            } else {
                count as f64
            };
            indices.push(index);
            values.push(tf * self.idf[index]);
        }

        let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in values.iter_mut() {
                *v /= norm;
            }
        }

        SparseVector {
            dim: self.n_features(),
            indices,
            values,
        }
    }

    pub fn transform_all<S: AsRef<str>>(&self, documents: &[Vec<S>]) -> Vec<SparseVector> {
        documents.iter().map(|doc| self.transform(doc)).collect()
    }
}

/// `ln((1 + n) / (1 + df)) + 1`
pub fn smoothed_idf(n_docs: usize, df: usize) -> f64 {
    ((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0
}
