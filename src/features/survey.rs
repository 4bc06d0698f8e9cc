//! Per-participant survey lookup
//!
//! A survey table is a comma-separated file whose first column holds the
//! participant id and whose remaining columns hold that participant's values.
//! Conversations are matched on their participant id; unknown ids get `-1` in
//! every column.

use crate::conversation::Conversation;
use crate::error::FeatureError;
use crate::features::{AggregationMode, Extraction, FeatureExtractor};
use crate::types::{FeatureColumns, FeatureValue};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Value reported for every column when a participant has no survey row
pub const MISSING_PARTICIPANT_VALUE: f64 = -1.0;

/// Survey answers keyed by participant id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurveyTable {
    heading: Vec<String>,
    rows: HashMap<String, Vec<FeatureValue>>,
}

impl SurveyTable {
    pub fn load(path: &Path) -> Result<Self, FeatureError> {
        let file = std::fs::File::open(path)?;
        let table = Self::from_reader(file)?;
        debug!(
            path = %path.display(),
            columns = table.heading.len(),
            participants = table.rows.len(),
            "loaded survey table"
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FeatureError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
            return Err(FeatureError::SurveyError("missing header row".to_string()));
        }
        let heading: Vec<String> = headers
            .iter()
            .skip(1)
            .map(|h| h.trim().to_string())
            .collect();

        let mut rows = HashMap::new();
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            // Row 1 is the header
            let row_no = index + 2;
            if record.len() != heading.len() + 1 {
                return Err(FeatureError::SurveyError(format!(
                    "row {} has {} fields, expected {}",
                    row_no,
                    record.len(),
                    heading.len() + 1
                )));
            }

            let id = record[0].trim().to_string();
            let values = record.iter().skip(1).map(FeatureValue::from_cell).collect();
            rows.insert(id, values);
        }

        Ok(Self { heading, rows })
    }

    /// Column names, excluding the id column
    pub fn heading(&self) -> &[String] {
        &self.heading
    }

    pub fn get(&self, participant_id: &str) -> Option<&[FeatureValue]> {
        self.rows.get(participant_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Attaches a participant's survey row to their conversation
#[derive(Debug, Clone)]
pub struct SurveyExtractor {
    table: Arc<SurveyTable>,
}

impl SurveyExtractor {
    pub fn new(table: Arc<SurveyTable>) -> Self {
        Self { table }
    }
}

impl FeatureExtractor for SurveyExtractor {
    fn name(&self) -> &str {
        "survey"
    }

    fn mode(&self) -> AggregationMode {
        AggregationMode::WholeConversation
    }

    fn extract(&self, conversation: &Conversation) -> Result<Extraction, FeatureError> {
        let values: Vec<FeatureValue> = match self.table.get(conversation.participant_id()) {
            Some(values) => values.to_vec(),
            None => {
                debug!(
                    participant = %conversation.participant_id(),
                    "no survey row for participant"
                );
                vec![FeatureValue::Number(MISSING_PARTICIPANT_VALUE); self.table.heading.len()]
            }
        };

        Ok(Extraction::Columns(FeatureColumns {
            heading: self.table.heading.clone(),
            values,
        }))
    }
}
