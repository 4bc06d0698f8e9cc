//! Distinct active days per speaker

use crate::conversation::Conversation;
use crate::error::FeatureError;
use crate::features::{AggregationMode, Extraction, FeatureExtractor};
use crate::types::FeatureColumns;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Emits `{speaker}_Days_Active` for every speaker, sorted
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveDaysExtractor;

impl ActiveDaysExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl FeatureExtractor for ActiveDaysExtractor {
    fn name(&self) -> &str {
        "active_days"
    }

    fn mode(&self) -> AggregationMode {
        AggregationMode::WholeConversation
    }

    fn extract(&self, conversation: &Conversation) -> Result<Extraction, FeatureError> {
        let mut days: BTreeMap<&str, BTreeSet<NaiveDate>> = BTreeMap::new();
        for utterance in conversation.utterances() {
            days.entry(utterance.speaker.as_str())
                .or_default()
                .insert(utterance.date());
        }

        let mut columns = FeatureColumns::new();
        for (speaker, dates) in days {
            columns.push(format!("{}_Days_Active", speaker), dates.len());
        }
        Ok(Extraction::Columns(columns))
    }
}
