//! Conversations
//!
//! A conversation is the ordered message sequence of one transcript file. It
//! owns its messages, trims them to a trailing time window, runs extractors
//! over them and concatenates the extractors' columns into one output row.

use crate::cleaner::TextCleaner;
use crate::error::FeatureError;
use crate::features::{aggregate_by_day, AggregationMode, Extraction, FeatureExtractor};
use crate::types::{FeatureColumns, FeatureRow, Utterance};
use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Number of fields in a transcript row: speaker, timestamp, body
const TRANSCRIPT_FIELDS: usize = 3;

/// Output of one extractor, computed when it was attached
#[derive(Debug, Clone)]
struct AttachedExtractor {
    name: String,
    feature_names: Vec<String>,
    normalize: bool,
    extraction: Extraction,
}

/// One transcript's messages and the features computed over them
#[derive(Debug, Clone)]
pub struct Conversation {
    participant_id: String,
    source: Option<PathBuf>,
    utterances: Vec<Utterance>,
    attached: Vec<AttachedExtractor>,
}

impl Conversation {
    /// Conversation over already-built messages.
    ///
    /// Messages without tokens are dropped; order is otherwise kept as given.
    pub fn new(participant_id: impl Into<String>, utterances: Vec<Utterance>) -> Self {
        Self {
            participant_id: participant_id.into(),
            source: None,
            utterances: utterances
                .into_iter()
                .filter(|u| !u.tokens.is_empty())
                .collect(),
            attached: Vec::new(),
        }
    }

    /// Load a tab-delimited transcript (`speaker<TAB>MM/DD/YYYY HH:MM<TAB>body`).
    ///
    /// The participant id is the file name without its extension. Any malformed
    /// row fails the whole load.
    pub fn load(path: &Path, cleaner: &TextCleaner) -> Result<Self, FeatureError> {
        let file = std::fs::File::open(path)?;
        let participant_id = participant_id_for(path);
        let mut conversation = Self::from_reader(file, participant_id, path, cleaner)?;
        conversation.source = Some(path.to_path_buf());
        Ok(conversation)
    }

    /// Parse a transcript from any reader; `path` is only used in errors
    pub fn from_reader<R: Read>(
        reader: R,
        participant_id: impl Into<String>,
        path: &Path,
        cleaner: &TextCleaner,
    ) -> Result<Self, FeatureError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .quote(b'"')
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut utterances = Vec::new();
        for (index, record) in csv_reader.records().enumerate() {
            let row = index + 1;
            let record = record.map_err(|e| FeatureError::TranscriptRow {
                path: path.to_path_buf(),
                row,
                message: e.to_string(),
            })?;

            if record.len() != TRANSCRIPT_FIELDS {
                return Err(FeatureError::TranscriptRow {
                    path: path.to_path_buf(),
                    row,
                    message: format!(
                        "expected {} tab-separated fields, found {}",
                        TRANSCRIPT_FIELDS,
                        record.len()
                    ),
                });
            }

            let utterance = Utterance::parse(&record[0], &record[1], &record[2], cleaner)
                .map_err(|e| FeatureError::TranscriptRow {
                    path: path.to_path_buf(),
                    row,
                    message: e.to_string(),
                })?;
            utterances.push(utterance);
        }

        let total = utterances.len();
        let conversation = Self::new(participant_id, utterances);
        debug!(
            path = %path.display(),
            rows = total,
            kept = conversation.len(),
            "loaded transcript"
        );
        Ok(conversation)
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    /// Transcript file this conversation was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn utterances(&self) -> &[Utterance] {
        &self.utterances
    }

    pub fn len(&self) -> usize {
        self.utterances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.utterances.is_empty()
    }

    /// Distinct speakers, sorted
    pub fn speakers(&self) -> Vec<&str> {
        self.utterances
            .iter()
            .map(|u| u.speaker.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.utterances.last().map(|u| u.timestamp)
    }

    /// Keep only the trailing `num_days` whole days before the last message's date.
    ///
    /// Messages strictly between midnight `num_days` days before the last
    /// message's date and midnight of that date are kept; both bounds are
    /// exclusive, so the last day itself is dropped. `num_days <= 0` keeps
    /// everything; a window reaching past the earliest representable date has
    /// no lower bound.
    pub fn limit_time_range(&mut self, num_days: i64) {
        if num_days <= 0 {
            return;
        }
        let Some(last) = self.last_timestamp() else {
            return;
        };

        let max_threshold = last.date().and_time(NaiveTime::default());
        let min_threshold =
            TimeDelta::try_days(num_days).and_then(|d| max_threshold.checked_sub_signed(d));

        let before = self.utterances.len();
        self.utterances.retain(|u| {
            min_threshold.map_or(true, |min| u.timestamp > min) && u.timestamp < max_threshold
        });
        debug!(
            participant = %self.participant_id,
            num_days,
            removed = before - self.utterances.len(),
            "limited time range"
        );
    }

    /// Run an extractor over the current messages and keep its output.
    ///
    /// Attachment order is the column order of [`Conversation::aggregate`].
    pub fn add_extractor(&mut self, extractor: &dyn FeatureExtractor) -> Result<(), FeatureError> {
        let extraction = extractor.extract(self)?;
        if extraction.mode() != extractor.mode() {
            return Err(FeatureError::Extraction(format!(
                "extractor '{}' declared {} aggregation but produced {} output",
                extractor.name(),
                extractor.mode().label(),
                extraction.mode().label()
            )));
        }

        self.attached.push(AttachedExtractor {
            name: extractor.name().to_string(),
            feature_names: extractor.feature_names(),
            normalize: extractor.normalize(),
            extraction,
        });
        Ok(())
    }

    /// Names of the attached extractors, in attachment order
    pub fn extractor_names(&self) -> Vec<&str> {
        self.attached.iter().map(|a| a.name.as_str()).collect()
    }

    /// Concatenate every attached extractor's aggregated columns
    pub fn aggregate(&self) -> Result<FeatureRow, FeatureError> {
        let mut columns = FeatureColumns::new();

        for attached in &self.attached {
            let extracted = match &attached.extraction {
                Extraction::PerUtterance(vectors) => aggregate_by_day(
                    &self.utterances,
                    vectors,
                    &attached.feature_names,
                    attached.normalize,
                )
                .map_err(|e| {
                    FeatureError::Extraction(format!("{}: {}", attached.name, e))
                })?,
                Extraction::Columns(columns) => columns.clone(),
            };
            columns.extend(extracted);
        }

        Ok(FeatureRow {
            participant_id: self.participant_id.clone(),
            columns,
        })
    }

    /// Occurrences of every normalized token across all messages
    pub fn token_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for utterance in &self.utterances {
            for (token, count) in utterance.token_counts() {
                *counts.entry(token).or_insert(0) += count;
            }
        }
        counts
    }
}

/// Participant id of a transcript path: its file name without extension
pub fn participant_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_support::conversation;
    use crate::types::FeatureValue;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn parse(text: &str) -> Result<Conversation, FeatureError> {
        Conversation::from_reader(
            text.as_bytes(),
            "p01",
            Path::new("p01.tsv"),
            &TextCleaner::default(),
        )
    }

    #[test]
    fn test_parse_transcript() {
        let conv = parse(
            "A\t01/01/2020 09:00\thello there\nB\t01/01/2020 09:05\t\"hi, you\"\n",
        )
        .unwrap();
        assert_eq!(conv.len(), 2);
        assert_eq!(conv.utterances()[0].tokens, vec!["hello", "there"]);
        assert_eq!(conv.utterances()[1].tokens, vec!["hi", "you"]);
        assert_eq!(conv.speakers(), vec!["A", "B"]);
    }

    #[test]
    fn test_empty_messages_dropped_in_order() {
        let conv = parse(
            "A\t01/01/2020 09:00\tfirst\nB\t01/01/2020 09:01\t:)\nA\t01/01/2020 09:02\tsecond\n",
        )
        .unwrap();
        let bodies: Vec<String> = conv.utterances().iter().map(|u| u.body()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
    }

    #[test]
    fn test_bad_timestamp_fails_whole_file() {
        let err = parse("A\t01/01/2020 09:00\tok\nB\t2020-01-01 09:05\tbad\n").unwrap_err();
        match err {
            FeatureError::TranscriptRow { row, .. } => assert_eq!(row, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_field_count_is_fatal() {
        assert!(matches!(
            parse("A\t01/01/2020 09:00\n"),
            Err(FeatureError::TranscriptRow { row: 1, .. })
        ));
    }

    #[test]
    fn test_load_derives_participant_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("participant_42.csv");
        fs::write(&path, "A\t01/01/2020 09:00\thello\n").unwrap();

        let conv = Conversation::load(&path, &TextCleaner::default()).unwrap();
        assert_eq!(conv.participant_id(), "participant_42");
        assert_eq!(conv.source(), Some(path.as_path()));
    }

    #[test]
    fn test_limit_time_range_bounds_are_exclusive() {
        let mut conv = conversation(&[
            ("A", "01/01/2020 00:00", "at min threshold"),
            ("A", "01/01/2020 00:01", "just inside"),
            ("B", "01/02/2020 23:59", "inside"),
            ("A", "01/03/2020 00:00", "at max threshold"),
            ("B", "01/03/2020 12:00", "last day"),
        ]);
        conv.limit_time_range(2);

        let bodies: Vec<String> = conv.utterances().iter().map(|u| u.body()).collect();
        assert_eq!(bodies, vec!["just inside", "inside"]);
    }

    #[test]
    fn test_limit_time_range_disabled() {
        let mut conv = conversation(&[
            ("A", "01/01/2020 09:00", "x"),
            ("A", "01/09/2020 09:00", "y"),
        ]);
        conv.limit_time_range(0);
        assert_eq!(conv.len(), 2);
        conv.limit_time_range(-3);
        assert_eq!(conv.len(), 2);
    }

    #[test]
    fn test_limit_time_range_huge_window_has_no_lower_bound() {
        let mut conv = conversation(&[
            ("A", "01/01/1990 09:00", "ancient"),
            ("B", "01/02/2020 09:00", "recent"),
            ("A", "01/03/2020 12:00", "last day"),
        ]);
        conv.limit_time_range(200_000_000);

        let bodies: Vec<String> = conv.utterances().iter().map(|u| u.body()).collect();
        assert_eq!(bodies, vec!["ancient", "recent"]);

        conv.limit_time_range(i64::MAX);
        assert_eq!(conv.len(), 1);
    }

    #[test]
    fn test_limit_time_range_empty() {
        let mut conv = conversation(&[]);
        conv.limit_time_range(14);
        assert!(conv.is_empty());
    }

    struct FixedColumns;

    impl FeatureExtractor for FixedColumns {
        fn name(&self) -> &str {
            "fixed"
        }
        fn mode(&self) -> AggregationMode {
            AggregationMode::WholeConversation
        }
        fn extract(&self, conversation: &Conversation) -> Result<Extraction, FeatureError> {
            let mut columns = FeatureColumns::new();
            columns.push("Messages", conversation.len());
            Ok(Extraction::Columns(columns))
        }
    }

    struct Mislabeled;

    impl FeatureExtractor for Mislabeled {
        fn name(&self) -> &str {
            "mislabeled"
        }
        fn mode(&self) -> AggregationMode {
            AggregationMode::ByDay
        }
        fn extract(&self, _conversation: &Conversation) -> Result<Extraction, FeatureError> {
            Ok(Extraction::Columns(FeatureColumns::new()))
        }
    }

    #[test]
    fn test_aggregate_concatenates_in_attachment_order() {
        let mut conv = conversation(&[("A", "01/01/2020 09:00", "x y")]);
        conv.add_extractor(&FixedColumns).unwrap();
        conv.add_extractor(&crate::features::WordCountExtractor::new())
            .unwrap();

        assert_eq!(conv.extractor_names(), vec!["fixed", "word_counts"]);
        let row = conv.aggregate().unwrap();
        assert_eq!(row.heading()[0], "Conversation");
        assert_eq!(row.heading()[1], "Messages");
        assert_eq!(row.heading()[2], "A_All_Words_Mean");
        assert_eq!(row.get("A_All_Words_Mean"), Some(&FeatureValue::Number(2.0)));
        assert_eq!(row.participant_id, "test");
    }

    #[test]
    fn test_mode_mismatch_rejected() {
        let mut conv = conversation(&[("A", "01/01/2020 09:00", "x")]);
        assert!(matches!(
            conv.add_extractor(&Mislabeled),
            Err(FeatureError::Extraction(_))
        ));
    }

    #[test]
    fn test_token_counts() {
        let conv = conversation(&[
            ("A", "01/01/2020 09:00", "ok ok"),
            ("B", "01/01/2020 09:01", "ok bye"),
        ]);
        let counts = conv.token_counts();
        assert_eq!(counts["ok"], 3);
        assert_eq!(counts["bye"], 1);
    }

    #[test]
    fn test_participant_id_for() {
        assert_eq!(participant_id_for(Path::new("/data/p07.tsv")), "p07");
        assert_eq!(participant_id_for(Path::new("p07")), "p07");
    }
}
