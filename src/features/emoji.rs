//! Emoji counts
//!
//! Declared for completeness of the extractor set but intentionally inert: it
//! has no feature names, so aggregation contributes no columns.

use crate::conversation::Conversation;
use crate::error::FeatureError;
use crate::features::{AggregationMode, Extraction, FeatureExtractor};

#[derive(Debug, Clone, Copy, Default)]
pub struct EmojiExtractor;

impl EmojiExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl FeatureExtractor for EmojiExtractor {
    fn name(&self) -> &str {
        "emoji"
    }

    fn mode(&self) -> AggregationMode {
        AggregationMode::ByDay
    }

    fn extract(&self, conversation: &Conversation) -> Result<Extraction, FeatureError> {
        Ok(Extraction::PerUtterance(vec![
            Vec::new();
            conversation.utterances().len()
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_support::conversation;

    #[test]
    fn test_contributes_no_columns() {
        let mut conv = conversation(&[
            ("A", "07/04/2021 10:00", "fireworks"),
            ("B", "07/05/2021 10:00", "wow"),
        ]);
        conv.add_extractor(&EmojiExtractor::new()).unwrap();
        let row = conv.aggregate().unwrap();
        assert!(row.columns.is_empty());
        assert_eq!(row.heading(), vec!["Conversation".to_string()]);
    }
}
