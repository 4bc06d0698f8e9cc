//! Word and short-word counts

use crate::conversation::Conversation;
use crate::error::FeatureError;
use crate::features::{AggregationMode, Extraction, FeatureExtractor};

/// Tokens shorter than this many characters count as short words
const SHORT_WORD_MAX_CHARS: usize = 6;

/// Counts all tokens and short tokens per message
#[derive(Debug, Clone, Default)]
pub struct WordCountExtractor {
    normalize: bool,
}

impl WordCountExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report short words as a share of all words per day
    pub fn with_normalization(normalize: bool) -> Self {
        Self { normalize }
    }
}

impl FeatureExtractor for WordCountExtractor {
    fn name(&self) -> &str {
        "word_counts"
    }

    fn mode(&self) -> AggregationMode {
        AggregationMode::ByDay
    }

    fn feature_names(&self) -> Vec<String> {
        vec!["All_Words".to_string(), "Short_Words".to_string()]
    }

    fn normalize(&self) -> bool {
        self.normalize
    }

    fn extract(&self, conversation: &Conversation) -> Result<Extraction, FeatureError> {
        let vectors = conversation
            .utterances()
            .iter()
            .map(|u| {
                let short = u
                    .tokens
                    .iter()
                    .filter(|t| t.chars().count() < SHORT_WORD_MAX_CHARS)
                    .count();
                vec![u.tokens.len() as f64, short as f64]
            })
            .collect();
        Ok(Extraction::PerUtterance(vectors))
    }
}
