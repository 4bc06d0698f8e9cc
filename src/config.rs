//! Run configuration
//!
//! All knobs of an extraction run live in one serde-friendly struct so a run can
//! be described by a JSON file and then overridden field-by-field from the
//! command line.

use crate::error::FeatureError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default trailing window, in days, kept before the last message's date
pub const DEFAULT_TIME_WINDOW_DAYS: i64 = 14;

/// Default number of normalization passes applied to each message body
pub const DEFAULT_NORMALIZATION_PASSES: usize = 3;

/// Upper bound on passes when running normalization to convergence
pub const DEFAULT_MAX_CONVERGENCE_PASSES: usize = 16;

/// Default output file
pub const DEFAULT_OUTPUT_FILE: &str = "all_features.csv";

/// Default part-of-speech tagger invocation (ARK Twitter NLP, CoNLL output)
pub const DEFAULT_TAGGER_COMMAND: &str = "java -XX:ParallelGCThreads=2 -Xmx500m -jar lib/ark-tweet-nlp-0.3.2/ark-tweet-nlp-0.3.2.jar --output-format conll";

/// Configuration for one extraction run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Trailing window in days; `<= 0` keeps every message.
    pub time_window_days: i64,
    /// Fixed number of normalization passes.
    pub normalization_passes: usize,
    /// Repeat passes until the token sequence stops changing instead.
    pub converge: bool,
    /// Cap on passes in convergence mode.
    pub max_convergence_passes: usize,
    /// Divide by-day features by their first (count) component.
    pub normalize_rates: bool,
    /// Shell-style command line for the part-of-speech tagger.
    pub tagger_command: String,
    /// Output CSV path (appended to).
    pub output: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            time_window_days: DEFAULT_TIME_WINDOW_DAYS,
            normalization_passes: DEFAULT_NORMALIZATION_PASSES,
            converge: false,
            max_convergence_passes: DEFAULT_MAX_CONVERGENCE_PASSES,
            normalize_rates: false,
            tagger_command: DEFAULT_TAGGER_COMMAND.to_string(),
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from JSON; absent fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, FeatureError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, FeatureError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize the effective configuration (used for diagnostics).
    pub fn to_json(&self) -> Result<String, FeatureError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.time_window_days, 14);
        assert_eq!(config.normalization_passes, 3);
        assert!(!config.converge);
        assert!(!config.normalize_rates);
        assert_eq!(config.output, PathBuf::from("all_features.csv"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json(r#"{ "time_window_days": 0, "converge": true }"#)
            .unwrap();
        assert_eq!(config.time_window_days, 0);
        assert!(config.converge);
        assert_eq!(config.normalization_passes, DEFAULT_NORMALIZATION_PASSES);
        assert_eq!(config.tagger_command, DEFAULT_TAGGER_COMMAND);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            PipelineConfig::from_json("{ not json"),
            Err(FeatureError::JsonError(_))
        ));
    }

    #[test]
    fn test_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let mut config = PipelineConfig::default();
        config.normalize_rates = true;
        config.output = PathBuf::from("out.csv");
        fs::write(&path, config.to_json().unwrap()).unwrap();

        let loaded = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
