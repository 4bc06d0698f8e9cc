//! Core data types
//!
//! This module defines the message, column and row types that flow through the
//! extraction pipeline.

use crate::cleaner::TextCleaner;
use crate::error::FeatureError;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Timestamp format used by transcripts (`MM/DD/YYYY HH:MM`, local time)
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M";

/// Label of the leading output column holding the participant id
pub const CONVERSATION_COLUMN: &str = "Conversation";

/// Parse a transcript timestamp.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, FeatureError> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| FeatureError::DateParseError(format!("'{}': {}", raw.trim(), e)))
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    /// Sender identity, trimmed
    pub speaker: String,
    /// Local send time
    pub timestamp: NaiveDateTime,
    /// Message text as it appeared in the transcript
    pub raw_body: String,
    /// Normalized lowercase tokens; may be empty
    pub tokens: Vec<String>,
}

impl Utterance {
    /// Build an utterance from one transcript row, normalizing its body.
    pub fn parse(
        speaker: &str,
        timestamp: &str,
        body: &str,
        cleaner: &TextCleaner,
    ) -> Result<Self, FeatureError> {
        let timestamp = parse_timestamp(timestamp)?;
        let raw_body = body.trim().to_string();
        let tokens = cleaner.clean(&raw_body);

        Ok(Self {
            speaker: speaker.trim().to_string(),
            timestamp,
            raw_body,
            tokens,
        })
    }

    /// Build an utterance from already-normalized tokens.
    pub fn from_tokens(speaker: &str, timestamp: NaiveDateTime, tokens: &[&str]) -> Self {
        Self {
            speaker: speaker.trim().to_string(),
            timestamp,
            raw_body: tokens.join(" "),
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Canonical body: the normalized tokens joined by single spaces
    pub fn body(&self) -> String {
        self.tokens.join(" ")
    }

    /// Calendar date of the message
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Hour of day (0-23)
    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }

    /// Occurrences of each normalized token in this message
    pub fn token_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for token in &self.tokens {
            *counts.entry(token.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// A single output cell.
///
/// Almost every feature is numeric; survey tables may carry free text, which is
/// passed through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Text(String),
}

impl FeatureValue {
    /// Parse a raw cell, keeping it as text when it is not numeric
    pub fn from_cell(cell: &str) -> Self {
        match cell.trim().parse::<f64>() {
            Ok(n) => FeatureValue::Number(n),
            Err(_) => FeatureValue::Text(cell.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(n) => Some(*n),
            FeatureValue::Text(_) => None,
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Number(value)
    }
}

impl From<usize> for FeatureValue {
    fn from(value: usize) -> Self {
        FeatureValue::Number(value as f64)
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Number(n) => write!(f, "{}", n),
            FeatureValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Named columns produced by one extractor (or a whole row).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureColumns {
    pub heading: Vec<String>,
    pub values: Vec<FeatureValue>,
}

impl FeatureColumns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<FeatureValue>) {
        self.heading.push(name.into());
        self.values.push(value.into());
    }

    pub fn extend(&mut self, other: FeatureColumns) {
        self.heading.extend(other.heading);
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.heading.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heading.is_empty()
    }

    /// Value of the first column with the given name
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.heading
            .iter()
            .position(|h| h == name)
            .map(|i| &self.values[i])
    }
}

/// The aggregated output row of one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub participant_id: String,
    pub columns: FeatureColumns,
}

impl FeatureRow {
    /// Header row: the conversation label followed by every feature column
    pub fn heading(&self) -> Vec<String> {
        std::iter::once(CONVERSATION_COLUMN.to_string())
            .chain(self.columns.heading.iter().cloned())
            .collect()
    }

    /// Data row: the participant id followed by every feature value
    pub fn record(&self) -> Vec<String> {
        std::iter::once(self.participant_id.clone())
            .chain(self.columns.values.iter().map(|v| v.to_string()))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.columns.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp(" 01/02/2020 09:05 ").unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2020, 1, 2).unwrap());
        assert_eq!(ts.hour(), 9);
    }

    #[test]
    fn test_parse_timestamp_rejects_other_formats() {
        assert!(matches!(
            parse_timestamp("2020-01-02 09:05"),
            Err(FeatureError::DateParseError(_))
        ));
        assert!(parse_timestamp("13/40/2020 09:05").is_err());
    }

    #[test]
    fn test_utterance_token_counts() {
        let ts = parse_timestamp("01/01/2020 10:00").unwrap();
        let utterance = Utterance::from_tokens(" A ", ts, &["ok", "ok", "bye"]);
        assert_eq!(utterance.speaker, "A");
        assert_eq!(utterance.body(), "ok ok bye");

        let counts = utterance.token_counts();
        assert_eq!(counts["ok"], 2);
        assert_eq!(counts["bye"], 1);
    }

    #[test]
    fn test_feature_value_display() {
        assert_eq!(FeatureValue::from(2.0).to_string(), "2");
        assert_eq!(FeatureValue::from(0.25).to_string(), "0.25");
        assert_eq!(FeatureValue::from(-1.0).to_string(), "-1");
        assert_eq!(FeatureValue::from_cell("abc").to_string(), "abc");
        assert_eq!(FeatureValue::from_cell("3.5"), FeatureValue::Number(3.5));
    }

    #[test]
    fn test_feature_row_heading_and_record() {
        let mut columns = FeatureColumns::new();
        columns.push("A_Days_Active", 2usize);
        columns.push("Mood", FeatureValue::Text("calm".to_string()));
        let row = FeatureRow {
            participant_id: "p01".to_string(),
            columns,
        };

        assert_eq!(row.heading(), vec!["Conversation", "A_Days_Active", "Mood"]);
        assert_eq!(row.record(), vec!["p01", "2", "calm"]);
        assert_eq!(row.get("A_Days_Active"), Some(&FeatureValue::Number(2.0)));
        assert_eq!(row.get("missing"), None);
    }
}
