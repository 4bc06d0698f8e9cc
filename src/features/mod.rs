//! Feature extractors
//!
//! Each extractor computes a property of a conversation's messages and reports
//! named numeric columns. Extractors come in two flavours, told apart by
//! [`AggregationMode`]:
//!
//! - **by-day** extractors produce one vector per message; the vectors are
//!   summed per speaker and calendar day, optionally turned into rates, and
//!   summarized as the per-speaker mean and variance across days
//! - **whole-conversation** extractors produce their final columns directly

pub mod active_days;
pub mod categories;
pub mod elapsed;
pub mod emoji;
pub mod pos;
pub mod survey;
pub mod time_of_day;
pub mod words;

pub use active_days::ActiveDaysExtractor;
pub use categories::CategoryExtractor;
pub use elapsed::ElapsedTimeExtractor;
pub use emoji::EmojiExtractor;
pub use pos::{PosTagExtractor, POS_TAGS};
pub use survey::{SurveyExtractor, SurveyTable};
pub use time_of_day::{hourly_activity_by_speaker, HourlyActivity, TimeOfDayExtractor};
pub use words::WordCountExtractor;

use crate::conversation::Conversation;
use crate::error::FeatureError;
use crate::types::{FeatureColumns, Utterance};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// How an extractor's output is turned into columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMode {
    /// Per-message vectors grouped by speaker and day
    ByDay,
    /// Columns computed from the whole message sequence
    WholeConversation,
}

impl AggregationMode {
    pub fn label(&self) -> &'static str {
        match self {
            AggregationMode::ByDay => "by-day",
            AggregationMode::WholeConversation => "whole-conversation",
        }
    }
}

/// Raw output of an extractor for one conversation
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// One vector per message, in message order
    PerUtterance(Vec<Vec<f64>>),
    /// Final columns
    Columns(FeatureColumns),
}

impl Extraction {
    pub fn mode(&self) -> AggregationMode {
        match self {
            Extraction::PerUtterance(_) => AggregationMode::ByDay,
            Extraction::Columns(_) => AggregationMode::WholeConversation,
        }
    }
}

/// A pluggable conversation feature
pub trait FeatureExtractor {
    /// Short name used in logs
    fn name(&self) -> &str;

    fn mode(&self) -> AggregationMode;

    /// Names of the per-message features (by-day extractors only)
    fn feature_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether by-day sums are divided by their first component
    fn normalize(&self) -> bool {
        false
    }

    /// Compute this feature over the conversation's current messages
    fn extract(&self, conversation: &Conversation) -> Result<Extraction, FeatureError>;
}

/// Population mean and variance; `(0.0, 0.0)` for an empty slice
pub fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}

/// Turn a day's sums into rates of its first component.
///
/// The first component is kept as a raw count. A zero count leaves every rate
/// at zero.
pub fn normalize_day(day: &mut [f64]) {
    let Some((first, rest)) = day.split_first_mut() else {
        return;
    };
    let denominator = *first;
    for value in rest.iter_mut() {
        *value = if denominator != 0.0 {
            *value / denominator
        } else {
            0.0
        };
    }
}

/// Aggregate per-message vectors by speaker and calendar day.
///
/// For every speaker (sorted), emits `{speaker}_{feature}_Mean` for each
/// feature, then `{speaker}_{feature}_Variance` for each feature, computed
/// across that speaker's day sums.
pub fn aggregate_by_day(
    utterances: &[Utterance],
    vectors: &[Vec<f64>],
    feature_names: &[String],
    normalize: bool,
) -> Result<FeatureColumns, FeatureError> {
    if utterances.len() != vectors.len() {
        return Err(FeatureError::Extraction(format!(
            "{} feature vectors for {} messages",
            vectors.len(),
            utterances.len()
        )));
    }

    let width = feature_names.len();
    let mut columns = FeatureColumns::new();
    if width == 0 {
        return Ok(columns);
    }

    let mut by_speaker: BTreeMap<&str, BTreeMap<NaiveDate, Vec<f64>>> = BTreeMap::new();
    for (utterance, vector) in utterances.iter().zip(vectors) {
        if vector.len() != width {
            return Err(FeatureError::Extraction(format!(
                "feature vector of length {} for {} features",
                vector.len(),
                width
            )));
        }
        let day = by_speaker
            .entry(utterance.speaker.as_str())
            .or_default()
            .entry(utterance.date())
            .or_insert_with(|| vec![0.0; width]);
        for (sum, value) in day.iter_mut().zip(vector) {
            *sum += value;
        }
    }

    for (speaker, mut days) in by_speaker {
        if normalize {
            days.values_mut().for_each(|day| normalize_day(day));
        }

        let mut means = Vec::with_capacity(width);
        let mut variances = Vec::with_capacity(width);
        for component in 0..width {
            let values: Vec<f64> = days.values().map(|day| day[component]).collect();
            let (mean, variance) = mean_and_variance(&values);
            means.push(mean);
            variances.push(variance);
        }

        for (name, mean) in feature_names.iter().zip(means) {
            columns.push(format!("{}_{}_Mean", speaker, name), mean);
        }
        for (name, variance) in feature_names.iter().zip(variances) {
            columns.push(format!("{}_{}_Variance", speaker, name), variance);
        }
    }

    Ok(columns)
}
