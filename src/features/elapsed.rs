//! Response-time statistics between consecutive messages

use crate::conversation::Conversation;
use crate::error::FeatureError;
use crate::features::{mean_and_variance, AggregationMode, Extraction, FeatureExtractor};
use crate::types::FeatureColumns;
use std::collections::BTreeMap;
use tracing::warn;

/// Summarizes the minutes between consecutive messages per speaker pair.
///
/// Each consecutive pair is keyed `"{previous}-{next}"`. For every key, in
/// sorted order, the extractor emits `_Count`, `_Min`, `_Max`, `_Mean` and
/// `_Variance` columns. Out-of-order timestamps yield negative gaps, which
/// are logged and kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElapsedTimeExtractor;

impl ElapsedTimeExtractor {
    pub fn new() -> Self {
        Self
    }
}

/// Minutes between consecutive messages, grouped by speaker pair
pub fn elapsed_minutes_by_pair(conversation: &Conversation) -> BTreeMap<String, Vec<f64>> {
    let mut by_pair: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for pair in conversation.utterances().windows(2) {
        let (previous, next) = (&pair[0], &pair[1]);
        let minutes = (next.timestamp - previous.timestamp).num_seconds() as f64 / 60.0;
        if minutes < 0.0 {
            warn!(
                participant = %conversation.participant_id(),
                previous = %previous.timestamp,
                next = %next.timestamp,
                minutes,
                "negative elapsed time between consecutive messages"
            );
        }
        by_pair
            .entry(format!("{}-{}", previous.speaker, next.speaker))
            .or_default()
            .push(minutes);
    }

    by_pair
}

impl FeatureExtractor for ElapsedTimeExtractor {
    fn name(&self) -> &str {
        "response_times"
    }

    fn mode(&self) -> AggregationMode {
        AggregationMode::WholeConversation
    }

    fn extract(&self, conversation: &Conversation) -> Result<Extraction, FeatureError> {
        let mut columns = FeatureColumns::new();

        for (key, minutes) in elapsed_minutes_by_pair(conversation) {
            let min = minutes.iter().copied().fold(f64::INFINITY, f64::min);
            let max = minutes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let (mean, variance) = mean_and_variance(&minutes);

            columns.push(format!("{}_Count", key), minutes.len());
            columns.push(format!("{}_Min", key), min);
            columns.push(format!("{}_Max", key), max);
            columns.push(format!("{}_Mean", key), mean);
            columns.push(format!("{}_Variance", key), variance);
        }

        Ok(Extraction::Columns(columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_support::conversation;
    use crate::types::FeatureValue;
    use pretty_assertions::assert_eq;

    fn columns(conv: &Conversation) -> FeatureColumns {
        match ElapsedTimeExtractor::new().extract(conv).unwrap() {
            Extraction::Columns(columns) => columns,
            other => panic!("unexpected extraction {:?}", other),
        }
    }

    #[test]
    fn test_alternating_speakers_keys() {
        let conv = conversation(&[
            ("A", "06/01/2021 09:00", "hey"),
            ("B", "06/01/2021 09:10", "hi"),
            ("A", "06/01/2021 09:40", "ok"),
        ]);
        let columns = columns(&conv);

        assert_eq!(
            columns.heading,
            vec![
                "A-B_Count", "A-B_Min", "A-B_Max", "A-B_Mean", "A-B_Variance", "B-A_Count",
                "B-A_Min", "B-A_Max", "B-A_Mean", "B-A_Variance",
            ]
        );
        assert_eq!(columns.get("A-B_Count"), Some(&FeatureValue::Number(1.0)));
        assert_eq!(columns.get("B-A_Count"), Some(&FeatureValue::Number(1.0)));
        assert_eq!(columns.get("A-B_Mean"), Some(&FeatureValue::Number(10.0)));
        assert_eq!(columns.get("B-A_Max"), Some(&FeatureValue::Number(30.0)));
    }

    #[test]
    fn test_same_speaker_pairs_summarized() {
        let conv = conversation(&[
            ("A", "06/01/2021 09:00", "one"),
            ("A", "06/01/2021 09:02", "two"),
            ("A", "06/01/2021 09:08", "three"),
        ]);
        let columns = columns(&conv);

        assert_eq!(columns.get("A-A_Count"), Some(&FeatureValue::Number(2.0)));
        assert_eq!(columns.get("A-A_Min"), Some(&FeatureValue::Number(2.0)));
        assert_eq!(columns.get("A-A_Max"), Some(&FeatureValue::Number(6.0)));
        assert_eq!(columns.get("A-A_Mean"), Some(&FeatureValue::Number(4.0)));
        assert_eq!(columns.get("A-A_Variance"), Some(&FeatureValue::Number(4.0)));
    }

    #[test]
    fn test_out_of_order_timestamps_kept_negative() {
        let conv = conversation(&[
            ("A", "06/01/2021 10:00", "late"),
            ("B", "06/01/2021 09:30", "early"),
        ]);
        let columns = columns(&conv);
        assert_eq!(columns.get("A-B_Min"), Some(&FeatureValue::Number(-30.0)));
    }

    #[test]
    fn test_single_message_has_no_columns() {
        let conv = conversation(&[("A", "06/01/2021 10:00", "alone")]);
        assert!(columns(&conv).is_empty());
    }
}
