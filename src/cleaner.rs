//! Message body normalization
//!
//! Turns a raw message body into its normalized token sequence:
//!
//! 1. literal fix-ups (encoding artifacts, curly quotes) and spacing around
//!    `/`, `-` and `'d` (applied once)
//! 2. one *pass*: tokenize → lowercase/trim → drop emoticons → strip edge
//!    punctuation → apply normalizer rules → drop tokens without a word
//!    character → re-join with single spaces
//!
//! Passes are chained, each consuming the previous pass's canonical body, so a
//! rule whose replacement contains several words or a new misspelling gets
//! re-tokenized and re-normalized by the next pass.

use crate::config::PipelineConfig;
use crate::normalizer::Normalizer;
use crate::text::{EmoticonClassifier, PatternEmoticonClassifier, Tokenizer, TweetTokenizer};
use regex::Regex;
use std::sync::OnceLock;

/// Apostrophe spellings folded to a straight apostrophe: UTF-8 `’` read as
/// Latin-1, the real `’`, and the cp1252 apostrophe
const QUOTE_CHARS: [&str; 3] = ["\u{e2}\u{80}\u{99}", "\u{2019}", "\u{92}"];

/// Encoding artifacts removed outright (a mis-decoded emoji)
const ENCODING_ARTIFACTS: [&str; 1] = ["\u{f0}\u{9f}'\u{9c}"];

/// Substrings padded with spaces so they tokenize separately
const SPACED_SEQUENCES: [&str; 3] = ["/", "-", "'d"];

/// Punctuation stripped from both ends of every token
const EDGE_PUNCTUATION: &[char] = &[
    ' ', '#', '\\', '-', '*', '!', '.', '_', '(', ')', '{', '}', '~', ',', '^',
];

fn word_char_re() -> &'static Regex {
    static WORD_CHAR_RE: OnceLock<Regex> = OnceLock::new();
    WORD_CHAR_RE.get_or_init(|| Regex::new(r"\w").expect("valid word character regex"))
}

/// How many normalization passes to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    /// Exactly this many passes (at least one)
    Fixed(usize),
    /// Until the canonical body stops changing, at most `max_passes`
    Converge { max_passes: usize },
}

impl Default for PassMode {
    fn default() -> Self {
        PassMode::Fixed(crate::config::DEFAULT_NORMALIZATION_PASSES)
    }
}

/// Result of one normalization pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanPass {
    pub tokens: Vec<String>,
    pub body: String,
}

/// Normalization pipeline for message bodies
pub struct TextCleaner {
    normalizer: Normalizer,
    tokenizer: Box<dyn Tokenizer>,
    emoticons: Box<dyn EmoticonClassifier>,
    mode: PassMode,
}

impl Default for TextCleaner {
    fn default() -> Self {
        Self::new(Normalizer::new())
    }
}

impl TextCleaner {
    /// Cleaner with the default tokenizer, emoticon classifier and pass count
    pub fn new(normalizer: Normalizer) -> Self {
        Self {
            normalizer,
            tokenizer: Box::new(TweetTokenizer),
            emoticons: Box::new(PatternEmoticonClassifier),
            mode: PassMode::default(),
        }
    }

    /// Cleaner whose pass mode follows the run configuration
    pub fn from_config(normalizer: Normalizer, config: &PipelineConfig) -> Self {
        let mode = if config.converge {
            PassMode::Converge {
                max_passes: config.max_convergence_passes,
            }
        } else {
            PassMode::Fixed(config.normalization_passes)
        };
        Self::new(normalizer).with_pass_mode(mode)
    }

    pub fn with_pass_mode(mut self, mode: PassMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: Box<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn with_emoticon_classifier(mut self, classifier: Box<dyn EmoticonClassifier>) -> Self {
        self.emoticons = classifier;
        self
    }

    pub fn pass_mode(&self) -> PassMode {
        self.mode
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Normalized tokens of a raw message body
    pub fn clean(&self, raw_body: &str) -> Vec<String> {
        let mut current = CleanPass {
            tokens: Vec::new(),
            body: prepare(raw_body),
        };

        match self.mode {
            PassMode::Fixed(passes) => {
                for _ in 0..passes.max(1) {
                    current = self.clean_pass(&current.body);
                }
            }
            PassMode::Converge { max_passes } => {
                for _ in 0..max_passes.max(1) {
                    let next = self.clean_pass(&current.body);
                    let stable = next.body == current.body;
                    current = next;
                    if stable {
                        break;
                    }
                }
            }
        }

        current.tokens
    }

    /// A single tokenize-and-replace pass over `body`
    pub fn clean_pass(&self, body: &str) -> CleanPass {
        let tokens: Vec<String> = self
            .tokenizer
            .tokenize(body)
            .into_iter()
            .map(|token| token.to_lowercase().trim().to_string())
            .filter(|token| self.emoticons.classify(token).is_none())
            .map(|token| token.trim_matches(EDGE_PUNCTUATION).to_string())
            .map(|token| self.normalizer.replace(&token).to_string())
            .filter(|token| word_char_re().is_match(token))
            .collect();

        let body = tokens.join(" ");
        CleanPass { tokens, body }
    }
}

/// Literal substitutions and spacing applied before the first pass
pub fn prepare(raw_body: &str) -> String {
    let mut body = raw_body.to_string();
    for quote in QUOTE_CHARS {
        body = body.replace(quote, "'");
    }
    for artifact in ENCODING_ARTIFACTS {
        body = body.replace(artifact, "");
    }
    for sequence in SPACED_SEQUENCES {
        body = body.replace(sequence, &format!(" {} ", sequence));
    }
    body
}
