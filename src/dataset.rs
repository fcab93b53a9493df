//! CSV corpus I/O
//!
//! Review corpora are CSV files with a header row. The text column is the
//! first of [`TEXT_COLUMNS`] present in the header; labeled corpora also
//! carry a `sentiment` column.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, SentimentError};
use crate::sentiment::{Review, Sentiment};
use crate::tokenizer::Tokenizer;

/// Accepted text column names, in order of preference.
pub const TEXT_COLUMNS: [&str; 5] = ["text", "review", "comment", "feedback", "processed_review"];

pub const SENTIMENT_COLUMN: &str = "sentiment";

/// Index of the preferred text column in `headers`.
pub fn detect_text_column(headers: &StringRecord) -> Option<usize> {
    TEXT_COLUMNS
        .iter()
        .find_map(|name| headers.iter().position(|h| h.trim() == *name))
}

/// Blank cells and the literal `nan` left behind by dataframe exports.
fn is_missing(text: &str) -> bool {
    let text = text.trim();
    text.is_empty() || text == "nan"
}

fn reader<R: Read>(source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new().flexible(true).from_reader(source)
}

/// Reads a labeled corpus. Rows that cannot be parsed, have no text or carry
/// an unknown sentiment are skipped with a warning.
pub fn load_labeled(path: &Path) -> Result<Vec<Review>> {
    let file = File::open(path)?;
    let reviews = read_labeled(file)?;
    info!(path = %path.display(), rows = reviews.len(), "Loaded labeled reviews");
    Ok(reviews)
}

/// Concatenates several labeled corpora in order. Any missing file fails the whole load.
pub fn load_labeled_many<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Review>> {
    let mut reviews = Vec::new();
    for path in paths {
        reviews.extend(load_labeled(path.as_ref())?);
    }
    Ok(reviews)
}

pub fn read_labeled<R: Read>(source: R) -> Result<Vec<Review>> {
    let mut rdr = reader(source);
    let headers = rdr.headers()?.clone();
    let text_col = detect_text_column(&headers).ok_or(SentimentError::MissingTextColumn)?;
    let label_col = headers
        .iter()
        .position(|h| h.trim() == SENTIMENT_COLUMN)
        .ok_or_else(|| SentimentError::MissingColumn(SENTIMENT_COLUMN.to_string()))?;

    let mut reviews = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(row = row + 1, error = %e, "Skipping unreadable row");
                continue;
            }
        };
        let text = record.get(text_col).unwrap_or_default();
        if is_missing(text) {
            continue;
        }
        match record.get(label_col).unwrap_or_default().parse::<Sentiment>() {
            Ok(sentiment) => reviews.push(Review::new(text.trim(), sentiment)),
            Err(e) => warn!(row = row + 1, error = %e, "Skipping row with unknown sentiment"),
        }
    }
    Ok(reviews)
}

/// Reads the text column of an unlabeled corpus as `(row_id, text)` pairs.
/// Ids are 1-based data row numbers; blank and `nan` rows are skipped but
/// still consume an id.
pub fn load_texts<R: Read>(source: R) -> Result<Vec<(usize, String)>> {
    let mut rdr = reader(source);
    let headers = rdr.headers()?.clone();
    let text_col = detect_text_column(&headers).ok_or(SentimentError::MissingTextColumn)?;

    let mut texts = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let id = row + 1;
        match record {
            Ok(record) => {
                let text = record.get(text_col).unwrap_or_default();
                if !is_missing(text) {
                    texts.push((id, text.trim().to_string()));
                }
            }
            Err(e) => warn!(row = id, error = %e, "Skipping unreadable row"),
        }
    }
    Ok(texts)
}

#[derive(Serialize)]
struct LabeledRow<'a> {
    review: &'a str,
    sentiment: Sentiment,
}

#[derive(Serialize)]
struct ProcessedRow<'a> {
    review: &'a str,
    processed_review: &'a str,
    sentiment: Sentiment,
}

#[derive(Serialize)]
struct TextRow<'a> {
    text: &'a str,
}

/// Writes `review,sentiment` rows.
pub fn write_labeled(path: &Path, reviews: &[Review]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for review in reviews {
        wtr.serialize(LabeledRow {
            review: &review.text,
            sentiment: review.sentiment,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes a single `text` column, the unlabeled batch-scoring layout.
pub fn write_texts<S: AsRef<str>>(path: &Path, texts: &[S]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for text in texts {
        wtr.serialize(TextRow {
            text: text.as_ref(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessStats {
    pub read: usize,
    pub written: usize,
}

/// Normalises a labeled corpus into `review,processed_review,sentiment`
/// rows, dropping reviews with no surviving token.
pub fn preprocess_file(input: &Path, output: &Path, tokenizer: &Tokenizer) -> Result<PreprocessStats> {
    let reviews = load_labeled(input)?;
    let mut wtr = csv::Writer::from_path(output)?;
    let mut written = 0;
    for review in &reviews {
        let processed = tokenizer.normalize_to_string(&review.text);
        if processed.is_empty() {
            continue;
        }
        wtr.serialize(ProcessedRow {
            review: &review.text,
            processed_review: &processed,
            sentiment: review.sentiment,
        })?;
        written += 1;
    }
    wtr.flush()?;

    let stats = PreprocessStats {
        read: reviews.len(),
        written,
    };
    info!(read = stats.read, written = stats.written, output = %output.display(), "Preprocessed reviews");
    Ok(stats)
}
