//! Token normalization rules
//!
//! A normalizer is an ordered table of full-token regular expressions and their
//! literal replacements, loaded from a tab-delimited rules file:
//!
//! ```text
//! u	you
//! gr8	great
//! ha(ha)+	haha
//! ```
//!
//! The first rule whose pattern matches the whole token wins.

use crate::error::FeatureError;
use regex::Regex;
use std::fs;
use std::path::Path;
use tracing::debug;

/// One compiled rewrite rule
#[derive(Debug, Clone)]
struct Rule {
    pattern: Regex,
    replacement: String,
}

/// Rule-based token rewriter
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    rules: Vec<Rule>,
}

impl Normalizer {
    /// An empty normalizer passes every token through unchanged
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rules from a tab-delimited file
    pub fn load(path: &Path) -> Result<Self, FeatureError> {
        let content = fs::read_to_string(path)?;
        let normalizer = Self::parse(&content)?;
        debug!(
            path = %path.display(),
            rules = normalizer.len(),
            "loaded normalizer rules"
        );
        Ok(normalizer)
    }

    /// Parse rules from the contents of a rules file.
    ///
    /// Blank lines are skipped. Any other line must hold exactly one
    /// `pattern<TAB>replacement` pair with a non-empty, valid pattern.
    pub fn parse(content: &str) -> Result<Self, FeatureError> {
        let mut normalizer = Self::new();

        for (index, line) in content.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != 2 {
                return Err(FeatureError::NormalizerRule {
                    line: index + 1,
                    message: format!("expected 2 tab-separated fields, found {}", fields.len()),
                });
            }

            let pattern = fields[0].trim();
            if pattern.is_empty() {
                return Err(FeatureError::NormalizerRule {
                    line: index + 1,
                    message: "empty pattern".to_string(),
                });
            }

            normalizer
                .add_rule(pattern, fields[1].trim())
                .map_err(|e| FeatureError::NormalizerRule {
                    line: index + 1,
                    message: e.to_string(),
                })?;
        }

        Ok(normalizer)
    }

    /// Append a rule; `pattern` must match a whole token to fire
    pub fn add_rule(&mut self, pattern: &str, replacement: &str) -> Result<(), FeatureError> {
        let pattern = Regex::new(&format!("^(?:{})$", pattern))?;
        self.rules.push(Rule {
            pattern,
            replacement: replacement.to_string(),
        });
        Ok(())
    }

    /// Replacement of the first rule matching `token`, else `token` itself
    pub fn replace<'a>(&'a self, token: &'a str) -> &'a str {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(token))
            .map(|rule| rule.replacement.as_str())
            .unwrap_or(token)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
