//! Part-of-speech tag counts
//!
//! All of a conversation's messages are tagged in a single batch request, then
//! each message's tags are counted against a fixed Penn Treebank-style tag
//! vocabulary. Tags outside the vocabulary are ignored.

use crate::conversation::Conversation;
use crate::error::FeatureError;
use crate::features::{AggregationMode, Extraction, FeatureExtractor};
use crate::text::PosTagger;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Counted tags, in output column order
pub const POS_TAGS: [&str; 37] = [
    "CC", "CD", "DT", "EX", "FW", "IN", "JJ", "JJR", "JJS", "LS", "MD", "NN", "NNS", "NNP",
    "NNPS", "PDT", "POS", "PRP", "PRP$", "RB", "RBR", "RBS", "RP", "SYM", "TO", "UH", "URL", "VB",
    "VBD", "VBG", "VBN", "VBP", "VBZ", "WDT", "WP", "WP$", "WRB",
];

/// Counts part-of-speech tags per message using an external tagger
pub struct PosTagExtractor {
    tagger: Box<dyn PosTagger>,
    normalize: bool,
}

impl PosTagExtractor {
    pub fn new(tagger: Box<dyn PosTagger>) -> Self {
        Self {
            tagger,
            normalize: false,
        }
    }

    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }
}

impl FeatureExtractor for PosTagExtractor {
    fn name(&self) -> &str {
        "pos_tags"
    }

    fn mode(&self) -> AggregationMode {
        AggregationMode::ByDay
    }

    fn feature_names(&self) -> Vec<String> {
        POS_TAGS.iter().map(|t| t.to_string()).collect()
    }

    fn normalize(&self) -> bool {
        self.normalize
    }

    fn extract(&self, conversation: &Conversation) -> Result<Extraction, FeatureError> {
        let messages: Vec<String> = conversation.utterances().iter().map(|u| u.body()).collect();
        let tagged = self.tagger.tag_batch(&messages)?;

        if tagged.len() != messages.len() {
            return Err(FeatureError::Tagger(format!(
                "tagger returned {} results for {} messages",
                tagged.len(),
                messages.len()
            )));
        }

        let mut unknown: BTreeSet<&str> = BTreeSet::new();
        let vectors = tagged
            .iter()
            .map(|tokens| {
                let mut counts = vec![0.0; POS_TAGS.len()];
                for token in tokens {
                    match POS_TAGS.iter().position(|t| *t == token.tag) {
                        Some(index) => counts[index] += 1.0,
                        None => {
                            unknown.insert(token.tag.as_str());
                        }
                    }
                }
                counts
            })
            .collect();

        if !unknown.is_empty() {
            warn!(
                participant = %conversation.participant_id(),
                tags = ?unknown,
                "ignoring tags outside the tag vocabulary"
            );
        }
        debug!(
            participant = %conversation.participant_id(),
            messages = messages.len(),
            "tagged messages"
        );

        Ok(Extraction::PerUtterance(vectors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_support::conversation;
    use crate::text::TaggedToken;
    use crate::types::FeatureValue;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Tags every token from a fixed word list, counting batch calls
    #[derive(Default)]
    struct LookupTagger {
        calls: Rc<Cell<usize>>,
    }

    impl PosTagger for LookupTagger {
        fn tag_batch(&self, messages: &[String]) -> Result<Vec<Vec<TaggedToken>>, FeatureError> {
            self.calls.set(self.calls.get() + 1);
            Ok(messages
                .iter()
                .map(|m| {
                    m.split_whitespace()
                        .map(|w| TaggedToken {
                            token: w.to_string(),
                            tag: match w {
                                "the" => "DT",
                                "dog" | "cat" => "NN",
                                "runs" => "VBZ",
                                "lol" => "!",
                                _ => "NNP",
                            }
                            .to_string(),
                            confidence: 0.9,
                        })
                        .collect()
                })
                .collect())
        }
    }

    struct ShortTagger;

    impl PosTagger for ShortTagger {
        fn tag_batch(&self, _messages: &[String]) -> Result<Vec<Vec<TaggedToken>>, FeatureError> {
            Ok(Vec::new())
        }
    }

    fn index(tag: &str) -> usize {
        POS_TAGS.iter().position(|t| *t == tag).unwrap()
    }

    #[test]
    fn test_counts_known_tags_and_ignores_others() {
        let conv = conversation(&[
            ("A", "02/02/2022 10:00", "the dog runs lol"),
            ("B", "02/02/2022 10:01", "the cat"),
        ]);
        let tagger = LookupTagger::default();
        let extractor = PosTagExtractor::new(Box::new(tagger));
        let Extraction::PerUtterance(vectors) = extractor.extract(&conv).unwrap() else {
            panic!("expected per-utterance output");
        };

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0][index("DT")], 1.0);
        assert_eq!(vectors[0][index("NN")], 1.0);
        assert_eq!(vectors[0][index("VBZ")], 1.0);
        // "!" is not in the vocabulary
        assert_eq!(vectors[0].iter().sum::<f64>(), 3.0);
        assert_eq!(vectors[1][index("NN")], 1.0);
    }

    #[test]
    fn test_single_batch_per_conversation() {
        let conv = conversation(&[
            ("A", "02/02/2022 10:00", "the dog"),
            ("A", "02/03/2022 10:00", "the cat"),
            ("A", "02/04/2022 10:00", "runs"),
        ]);
        let tagger = LookupTagger::default();
        let calls = Rc::clone(&tagger.calls);
        let extractor = PosTagExtractor::new(Box::new(tagger));
        extractor.extract(&conv).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_result_count_mismatch() {
        let conv = conversation(&[("A", "02/02/2022 10:00", "the dog")]);
        let extractor = PosTagExtractor::new(Box::new(ShortTagger));
        assert!(matches!(
            extractor.extract(&conv),
            Err(FeatureError::Tagger(_))
        ));
    }

    #[test]
    fn test_aggregated_columns() {
        let mut conv = conversation(&[("A", "02/02/2022 10:00", "the dog")]);
        let tagger = LookupTagger::default();
        conv.add_extractor(&PosTagExtractor::new(Box::new(tagger)))
            .unwrap();
        let row = conv.aggregate().unwrap();

        assert_eq!(row.columns.len(), POS_TAGS.len() * 2);
        assert_eq!(row.get("A_NN_Mean"), Some(&FeatureValue::Number(1.0)));
        assert_eq!(row.get("A_PRP$_Variance"), Some(&FeatureValue::Number(0.0)));
    }
}
