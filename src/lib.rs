//! Texting Features - feature extraction for text-message transcripts
//!
//! Turns timestamped, per-conversation message transcripts into one fixed-width
//! row of numeric features per conversation through a deterministic pipeline:
//! transcript parsing → multi-pass text normalization → time-window trimming →
//! feature extraction → per-day / whole-conversation aggregation → CSV output.
//!
//! ## Modules
//!
//! - **Text**: normalizer rules, category dictionary, tokenizer / emoticon /
//!   tagger capabilities and the message cleaner
//! - **Features**: the extractor framework and every concrete extractor
//! - **Pipeline**: the batch driver and its CSV writers

pub mod cleaner;
pub mod config;
pub mod conversation;
pub mod dictionary;
pub mod error;
pub mod features;
pub mod normalizer;
pub mod pipeline;
pub mod text;
pub mod types;

pub use cleaner::{PassMode, TextCleaner};
pub use config::PipelineConfig;
pub use conversation::Conversation;
pub use dictionary::Dictionary;
pub use error::FeatureError;
pub use features::{AggregationMode, Extraction, FeatureExtractor};
pub use normalizer::Normalizer;
pub use pipeline::{FeaturePipeline, FeatureWriter, RunSummary, TimeHistogramWriter};
pub use types::{FeatureColumns, FeatureRow, FeatureValue, Utterance};

/// Crate version, reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
