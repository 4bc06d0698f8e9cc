//! Dictionary category counts

use crate::conversation::Conversation;
use crate::dictionary::Dictionary;
use crate::error::FeatureError;
use crate::features::{AggregationMode, Extraction, FeatureExtractor};
use std::sync::Arc;

/// Counts, per message, the tokens falling in each dictionary category.
///
/// The dictionary is shared read-only across every conversation of a run.
#[derive(Debug, Clone)]
pub struct CategoryExtractor {
    dictionary: Arc<Dictionary>,
    normalize: bool,
}

impl CategoryExtractor {
    pub fn new(dictionary: Arc<Dictionary>) -> Self {
        Self {
            dictionary,
            normalize: false,
        }
    }

    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }
}

impl FeatureExtractor for CategoryExtractor {
    fn name(&self) -> &str {
        "dictionary_categories"
    }

    fn mode(&self) -> AggregationMode {
        AggregationMode::ByDay
    }

    fn feature_names(&self) -> Vec<String> {
        self.dictionary.category_names()
    }

    fn normalize(&self) -> bool {
        self.normalize
    }

    fn extract(&self, conversation: &Conversation) -> Result<Extraction, FeatureError> {
        // BTreeMap iteration follows the sorted category names
        let vectors = conversation
            .utterances()
            .iter()
            .map(|u| {
                self.dictionary
                    .counts_by_category(&u.tokens)
                    .into_values()
                    .map(|count| count as f64)
                    .collect()
            })
            .collect();
        Ok(Extraction::PerUtterance(vectors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_support::conversation;
    use crate::types::FeatureValue;
    use pretty_assertions::assert_eq;

    const DICT: &str = "%\n2\tposemo\n1\taffect\n3\tnegemo\n%\nhapp*\t1\t2\nlove\t1\t2\nsad\t1\t3\n";

    fn extractor() -> CategoryExtractor {
        CategoryExtractor::new(Arc::new(Dictionary::parse(DICT).unwrap()))
    }

    #[test]
    fn test_feature_names_sorted() {
        assert_eq!(
            extractor().feature_names(),
            vec!["affect".to_string(), "negemo".to_string(), "posemo".to_string()]
        );
    }

    #[test]
    fn test_counts_per_message() {
        let conv = conversation(&[
            ("A", "04/10/2021 12:00", "so happy love it"),
            ("B", "04/10/2021 12:05", "sad"),
        ]);
        let extraction = extractor().extract(&conv).unwrap();
        assert_eq!(
            extraction,
            Extraction::PerUtterance(vec![vec![2.0, 0.0, 2.0], vec![1.0, 1.0, 0.0]])
        );
    }

    #[test]
    fn test_aggregated_category_columns() {
        let mut conv = conversation(&[
            ("A", "04/10/2021 12:00", "happy"),
            ("A", "04/11/2021 12:00", "happier sad"),
        ]);
        conv.add_extractor(&extractor()).unwrap();
        let row = conv.aggregate().unwrap();

        assert_eq!(row.get("A_affect_Mean"), Some(&FeatureValue::Number(1.5)));
        assert_eq!(row.get("A_affect_Variance"), Some(&FeatureValue::Number(0.25)));
        assert_eq!(row.get("A_posemo_Mean"), Some(&FeatureValue::Number(1.0)));
        assert_eq!(row.get("A_negemo_Mean"), Some(&FeatureValue::Number(0.5)));
    }
}
