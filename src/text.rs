//! Text-processing capabilities
//!
//! Tokenization, emoticon detection and part-of-speech tagging are pluggable:
//! the pipeline only depends on the traits below. Default implementations are
//! provided for each, the tagger delegating to an external process.

use crate::error::FeatureError;
use regex::Regex;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::thread;
use tracing::debug;

/// Splits a message body into word-level tokens
pub trait Tokenizer {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Emoticon category of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emoticon {
    Happy,
    Sad,
    /// Both a happy and a sad face were found
    Mixed,
}

/// Labels tokens that are emoticons; `None` means "not applicable"
pub trait EmoticonClassifier {
    fn classify(&self, token: &str) -> Option<Emoticon>;
}

/// One tagged token of a tagger result
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedToken {
    pub token: String,
    pub tag: String,
    pub confidence: f64,
}

/// Batch part-of-speech tagger.
///
/// Implementations return exactly one tag sequence per input message, in input
/// order.
pub trait PosTagger {
    fn tag_batch(&self, messages: &[String]) -> Result<Vec<Vec<TaggedToken>>, FeatureError>;
}

fn tweet_token_re() -> &'static Regex {
    static TWEET_TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    TWEET_TOKEN_RE.get_or_init(|| {
        Regex::new(concat!(
            r"(?:https?://|www\.)\S+",
            r"|<3+",
            r"|[<>]?[:;=][\-oO\*']?[\)\]\(\[dDpP/\\\}\{@\|]+",
            r"|\^_\^",
            r"|[@#]\w+",
            r"|\d+(?:[.,:]\d+)+",
            r"|\w+(?:['’]\w+)*",
            r"|['’]\w+",
            r"|[^\w\s]+",
        ))
        .expect("valid tweet token regex")
    })
}

/// Regex tokenizer for informal text.
///
/// URLs, emoticons, mentions, hashtags, numbers with separators and words with
/// internal apostrophes each stay one token; runs of other punctuation are
/// grouped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TweetTokenizer;

impl Tokenizer for TweetTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        tweet_token_re()
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

fn happy_re() -> &'static Regex {
    static HAPPY_RE: OnceLock<Regex> = OnceLock::new();
    HAPPY_RE.get_or_init(|| {
        Regex::new(r"(?:\^_\^|[:=][oO\-]?[D\)\]])").expect("valid happy emoticon regex")
    })
}

fn sad_re() -> &'static Regex {
    static SAD_RE: OnceLock<Regex> = OnceLock::new();
    SAD_RE.get_or_init(|| Regex::new(r"[:=][oO\-]?[\(\[]").expect("valid sad emoticon regex"))
}

/// Western-style smiley and frowny face detector.
///
/// A token is an emoticon when it contains a face anywhere, so `ok:)` is
/// classified as happy.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternEmoticonClassifier;

impl EmoticonClassifier for PatternEmoticonClassifier {
    fn classify(&self, token: &str) -> Option<Emoticon> {
        match (happy_re().is_match(token), sad_re().is_match(token)) {
            (true, true) => Some(Emoticon::Mixed),
            (true, false) => Some(Emoticon::Happy),
            (false, true) => Some(Emoticon::Sad),
            (false, false) => None,
        }
    }
}

/// Tagger backed by an external process speaking CoNLL.
///
/// The process receives one message per line on stdin and must print one
/// `token<TAB>tag<TAB>confidence` line per token, with a blank line after each
/// message. It is spawned once per batch.
#[derive(Debug, Clone)]
pub struct CommandTagger {
    program: String,
    args: Vec<String>,
}

impl CommandTagger {
    /// Build from a whitespace-separated command line
    pub fn new(command: &str) -> Result<Self, FeatureError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| FeatureError::Tagger("empty tagger command".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl PosTagger for CommandTagger {
    fn tag_batch(&self, messages: &[String]) -> Result<Vec<Vec<TaggedToken>>, FeatureError> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }

        debug!(program = %self.program, messages = messages.len(), "running tagger");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                FeatureError::Tagger(format!("failed to start '{}': {}", self.program, e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| FeatureError::Tagger("tagger stdin unavailable".to_string()))?;
        let input: String = messages
            .iter()
            .map(|m| format!("{}\n", m.replace('\n', " ")))
            .collect();
        // Feed stdin from a separate thread so a chatty child cannot deadlock us
        let writer = thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child.wait_with_output()?;
        let written = writer
            .join()
            .map_err(|_| FeatureError::Tagger("tagger input thread panicked".to_string()))?;

        if !output.status.success() {
            return Err(FeatureError::Tagger(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        written?;

        let parsed = parse_conll(&String::from_utf8_lossy(&output.stdout))?;
        if parsed.len() != messages.len() {
            return Err(FeatureError::Tagger(format!(
                "expected {} tagged messages, got {}",
                messages.len(),
                parsed.len()
            )));
        }
        Ok(parsed)
    }
}

/// Parse CoNLL tagger output into one token sequence per message
pub fn parse_conll(output: &str) -> Result<Vec<Vec<TaggedToken>>, FeatureError> {
    let mut messages = Vec::new();
    let mut current: Vec<TaggedToken> = Vec::new();

    for (index, line) in output.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            if !current.is_empty() {
                messages.push(std::mem::take(&mut current));
            }
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 3 {
            return Err(FeatureError::Tagger(format!(
                "malformed tagger line {}: '{}'",
                index + 1,
                line
            )));
        }
        let confidence = fields[2].trim().parse::<f64>().map_err(|e| {
            FeatureError::Tagger(format!("bad confidence on tagger line {}: {}", index + 1, e))
        })?;

        current.push(TaggedToken {
            token: fields[0].to_string(),
            tag: fields[1].to_string(),
            confidence,
        });
    }

    if !current.is_empty() {
        messages.push(current);
    }

    Ok(messages)
}
