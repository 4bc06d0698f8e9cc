//! Error types for texting-features

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading inputs or extracting features.
///
/// Every variant is fatal for the run: the driver stops at the first error and
/// leaves whatever was already flushed for earlier conversations untouched.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Malformed normalizer rule on line {line}: {message}")]
    NormalizerRule { line: usize, message: String },

    #[error("Malformed dictionary entry on line {line}: {message}")]
    DictionaryEntry { line: usize, message: String },

    #[error("Malformed transcript row {row} in {}: {message}", path.display())]
    TranscriptRow {
        path: PathBuf,
        row: usize,
        message: String,
    },

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Survey table error: {0}")]
    SurveyError(String),

    #[error("Tagger error: {0}")]
    Tagger(String),

    #[error("Feature extraction error: {0}")]
    Extraction(String),
}
