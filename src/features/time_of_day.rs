//! Hour-of-day activity histograms

use crate::conversation::Conversation;
use crate::error::FeatureError;
use crate::features::{AggregationMode, Extraction, FeatureExtractor};
use crate::types::{FeatureColumns, Utterance};
use std::collections::BTreeMap;

pub const HOURS_PER_DAY: usize = 24;

/// Words and messages a speaker sent in each hour of the day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourlyActivity {
    pub words: [usize; HOURS_PER_DAY],
    pub messages: [usize; HOURS_PER_DAY],
}

impl Default for HourlyActivity {
    fn default() -> Self {
        Self {
            words: [0; HOURS_PER_DAY],
            messages: [0; HOURS_PER_DAY],
        }
    }
}

impl HourlyActivity {
    fn record(&mut self, utterance: &Utterance) {
        let hour = utterance.hour() as usize;
        self.words[hour] += utterance.tokens.len();
        self.messages[hour] += 1;
    }
}

/// Bucket every message by speaker and local hour of its timestamp
pub fn hourly_activity_by_speaker(utterances: &[Utterance]) -> BTreeMap<String, HourlyActivity> {
    let mut activity: BTreeMap<String, HourlyActivity> = BTreeMap::new();
    for utterance in utterances {
        activity
            .entry(utterance.speaker.clone())
            .or_default()
            .record(utterance);
    }
    activity
}

/// Emits, per speaker, `{speaker}_Words_Hour_{0..23}` followed by
/// `{speaker}_Messages_Hour_{0..23}`
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeOfDayExtractor;

impl TimeOfDayExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl FeatureExtractor for TimeOfDayExtractor {
    fn name(&self) -> &str {
        "time_of_day"
    }

    fn mode(&self) -> AggregationMode {
        AggregationMode::WholeConversation
    }

    fn extract(&self, conversation: &Conversation) -> Result<Extraction, FeatureError> {
        let mut columns = FeatureColumns::new();
        for (speaker, activity) in hourly_activity_by_speaker(conversation.utterances()) {
            for (hour, words) in activity.words.iter().enumerate() {
                columns.push(format!("{}_Words_Hour_{}", speaker, hour), *words);
            }
            for (hour, messages) in activity.messages.iter().enumerate() {
                columns.push(format!("{}_Messages_Hour_{}", speaker, hour), *messages);
            }
        }
        Ok(Extraction::Columns(columns))
    }
}
