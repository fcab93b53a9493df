//! Sentiment classification for healthcare reviews.
//!
//! Reviews are normalised into content tokens, weighted with TF-IDF over word
//! n-grams and labeled positive, negative or neutral by the best of several
//! classifiers trained offline. Serving falls back to a keyword heuristic
//! whenever no trained model is available.

pub mod analyzer;
pub mod artifacts;
pub mod balance;
pub mod classifier;
pub mod cli;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod fallback;
pub mod sentiment;
pub mod server;
pub mod synth;
pub mod tokenizer;
pub mod training;
pub mod vectorizer;

pub use analyzer::SentimentAnalyzer;
pub use error::{Result, SentimentError};
pub use sentiment::{ModelSource, Prediction, Review, Sentiment};
