//! Pipeline orchestration
//!
//! This module drives a batch run: each transcript is loaded, trimmed to the
//! trailing time window, run through every configured extractor and written as
//! one CSV row.
//!
//! Pipeline stages, per file:
//! 1. Conversation::load - parse rows and normalize message bodies
//! 2. Conversation::limit_time_range - keep the trailing window
//! 3. Conversation::add_extractor - compute each feature, in order
//! 4. Conversation::aggregate - concatenate columns into a row
//! 5. FeatureWriter::write_row - append to the shared output file

use crate::cleaner::TextCleaner;
use crate::config::{PipelineConfig, DEFAULT_TIME_WINDOW_DAYS};
use crate::conversation::Conversation;
use crate::error::FeatureError;
use crate::features::{hourly_activity_by_speaker, FeatureExtractor};
use crate::types::FeatureRow;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Counts reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Transcripts read
    pub files: usize,
    /// Feature rows appended to the output
    pub rows_written: usize,
    /// Transcripts that produced no row
    pub skipped: usize,
}

/// Batch feature extraction over transcript files.
///
/// The cleaner (with its normalizer) and every extractor, including any
/// dictionary or survey table they hold, are shared read-only by all
/// conversations of a run.
pub struct FeaturePipeline {
    cleaner: TextCleaner,
    extractors: Vec<Box<dyn FeatureExtractor>>,
    time_window_days: i64,
}

impl FeaturePipeline {
    /// Pipeline with no extractors and the default time window
    pub fn new(cleaner: TextCleaner) -> Self {
        Self {
            cleaner,
            extractors: Vec::new(),
            time_window_days: DEFAULT_TIME_WINDOW_DAYS,
        }
    }

    /// Pipeline whose time window follows the run configuration
    pub fn from_config(cleaner: TextCleaner, config: &PipelineConfig) -> Self {
        Self::new(cleaner).with_time_window(config.time_window_days)
    }

    /// Trailing window in days; `<= 0` keeps every message
    pub fn with_time_window(mut self, days: i64) -> Self {
        self.time_window_days = days;
        self
    }

    pub fn with_extractor(mut self, extractor: Box<dyn FeatureExtractor>) -> Self {
        self.add_extractor(extractor);
        self
    }

    /// Append an extractor; attachment order is output column order
    pub fn add_extractor(&mut self, extractor: Box<dyn FeatureExtractor>) {
        self.extractors.push(extractor);
    }

    pub fn extractor_names(&self) -> Vec<&str> {
        self.extractors.iter().map(|e| e.name()).collect()
    }

    pub fn cleaner(&self) -> &TextCleaner {
        &self.cleaner
    }

    pub fn time_window_days(&self) -> i64 {
        self.time_window_days
    }

    /// Load a transcript and trim it to the time window
    pub fn load_conversation(&self, path: &Path) -> Result<Conversation, FeatureError> {
        let mut conversation = Conversation::load(path, &self.cleaner)?;
        conversation.limit_time_range(self.time_window_days);
        Ok(conversation)
    }

    /// Run every extractor over a loaded conversation.
    ///
    /// Returns `None` when there is nothing to report: the conversation has no
    /// messages left, or no extractor is configured.
    pub fn process_conversation(
        &self,
        mut conversation: Conversation,
    ) -> Result<Option<FeatureRow>, FeatureError> {
        if conversation.is_empty() {
            warn!(
                participant = %conversation.participant_id(),
                "skipping conversation with no messages in the time window"
            );
            return Ok(None);
        }
        if self.extractors.is_empty() {
            debug!(
                participant = %conversation.participant_id(),
                "no extractors configured"
            );
            return Ok(None);
        }

        for extractor in &self.extractors {
            conversation.add_extractor(extractor.as_ref())?;
        }
        let row = conversation.aggregate()?;
        debug!(
            participant = %row.participant_id,
            messages = conversation.len(),
            columns = row.columns.len(),
            "extracted features"
        );
        Ok(Some(row))
    }

    /// Load and process a single transcript
    pub fn process_file(&self, path: &Path) -> Result<Option<FeatureRow>, FeatureError> {
        let conversation = self.load_conversation(path)?;
        self.process_conversation(conversation)
    }

    /// Process every transcript in order, appending one row per conversation.
    ///
    /// The first error aborts the run; rows already written stay in place.
    pub fn run<W: Write>(
        &self,
        paths: &[PathBuf],
        writer: &mut FeatureWriter<W>,
        mut histogram: Option<&mut TimeHistogramWriter>,
    ) -> Result<RunSummary, FeatureError> {
        let mut summary = RunSummary::default();

        for path in paths {
            summary.files += 1;
            let conversation = self.load_conversation(path)?;

            if let Some(histogram) = histogram.as_deref_mut() {
                if !conversation.is_empty() {
                    histogram.write_conversation(&conversation)?;
                }
            }

            match self.process_conversation(conversation)? {
                Some(row) => {
                    writer.write_row(&row)?;
                    summary.rows_written += 1;
                }
                None => summary.skipped += 1,
            }
        }

        info!(
            files = summary.files,
            rows = summary.rows_written,
            skipped = summary.skipped,
            "extraction finished"
        );
        Ok(summary)
    }
}

/// Comma-separated feature output with a single header row.
///
/// The header is the heading of the first row written. Later rows are written
/// as they are; a heading that differs from the header is logged, since
/// speaker-dependent column names can change between conversations.
pub struct FeatureWriter<W: Write> {
    writer: csv::Writer<W>,
    header: Option<Vec<String>>,
    rows_written: usize,
}

impl FeatureWriter<File> {
    /// Open `path` for appending, creating it if needed
    pub fn append(path: &Path) -> Result<Self, FeatureError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write> FeatureWriter<W> {
    pub fn new(inner: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(b',')
            .quote(b'"')
            .flexible(true)
            .from_writer(inner);
        Self {
            writer,
            header: None,
            rows_written: 0,
        }
    }

    pub fn write_row(&mut self, row: &FeatureRow) -> Result<(), FeatureError> {
        let heading = row.heading();
        match &self.header {
            None => {
                self.writer.write_record(&heading)?;
                self.header = Some(heading);
            }
            Some(header) if *header != heading => {
                warn!(
                    participant = %row.participant_id,
                    header_columns = header.len(),
                    row_columns = heading.len(),
                    "row heading differs from the header already written"
                );
            }
            Some(_) => {}
        }

        self.writer.write_record(row.record())?;
        // Rows already written survive a later fatal error
        self.writer.flush()?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// The header written so far, if any
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    pub fn into_inner(self) -> Result<W, FeatureError> {
        self.writer
            .into_inner()
            .map_err(|e| FeatureError::Io(e.into_error()))
    }
}

/// Tab-delimited per-speaker hour-of-day histogram.
///
/// Every conversation appends its own table: a header row
/// (`Conversation`, `Speaker`, `Words 0..23`, `Messages 0..23`) followed by one
/// row per speaker, sorted.
pub struct TimeHistogramWriter<W: Write = File> {
    writer: csv::Writer<W>,
}

impl TimeHistogramWriter<File> {
    pub fn append(path: &Path) -> Result<Self, FeatureError> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(file))
    }
}

impl<W: Write> TimeHistogramWriter<W> {
    pub fn new(inner: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .quote(b'"')
            .flexible(true)
            .from_writer(inner);
        Self { writer }
    }

    pub fn write_conversation(&mut self, conversation: &Conversation) -> Result<(), FeatureError> {
        let mut header = vec!["Conversation".to_string(), "Speaker".to_string()];
        header.extend((0..24).map(|hour| format!("Words {}", hour)));
        header.extend((0..24).map(|hour| format!("Messages {}", hour)));
        self.writer.write_record(&header)?;

        let label = match conversation.source() {
            Some(path) => path.display().to_string(),
            None => conversation.participant_id().to_string(),
        };
        for (speaker, activity) in hourly_activity_by_speaker(conversation.utterances()) {
            let mut record = vec![label.clone(), speaker];
            record.extend(activity.words.iter().map(|n| n.to_string()));
            record.extend(activity.messages.iter().map(|n| n.to_string()));
            self.writer.write_record(&record)?;
        }

        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W, FeatureError> {
        self.writer
            .into_inner()
            .map_err(|e| FeatureError::Io(e.into_error()))
    }
}
