//! Category dictionary
//!
//! Loads LIWC-style `.dic` files and maps words onto zero or more category
//! labels. The file has two `%`-delimited sections:
//!
//! ```text
//! %
//! 1	posemo
//! 2	negemo
//! %
//! happ*	1
//! hate	2
//! ```
//!
//! The first section maps short keys to category labels; the second lists word
//! stems (a trailing or embedded `*` matches any run of characters) and the keys
//! of every category the stem belongs to.

use crate::error::FeatureError;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

const SECTION_DELIMITER: &str = "%";

fn non_word_re() -> &'static Regex {
    static NON_WORD_RE: OnceLock<Regex> = OnceLock::new();
    NON_WORD_RE.get_or_init(|| Regex::new(r"\W").expect("valid non-word regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Preamble,
    Categories,
    Vocabulary,
}

/// A compiled vocabulary entry
#[derive(Debug, Clone)]
struct Stem {
    pattern: Regex,
    keys: Vec<String>,
}

/// Word-stem lexicon grouped into named categories
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    /// Category key -> human-readable label
    categories: BTreeMap<String, String>,
    /// Vocabulary in file order
    stems: Vec<Stem>,
}

impl Dictionary {
    /// Load a dictionary file
    pub fn load(path: &Path) -> Result<Self, FeatureError> {
        let content = fs::read_to_string(path)?;
        let dictionary = Self::parse(&content)?;
        debug!(
            path = %path.display(),
            categories = dictionary.categories.len(),
            stems = dictionary.stems.len(),
            "loaded dictionary"
        );
        Ok(dictionary)
    }

    /// Parse the contents of a dictionary file
    pub fn parse(content: &str) -> Result<Self, FeatureError> {
        let mut dictionary = Self::default();
        let mut section = Section::Preamble;
        // Vocabulary keys are checked once every category is known
        let mut pending: Vec<(usize, Vec<String>)> = Vec::new();

        for (index, raw) in content.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if line == SECTION_DELIMITER {
                section = match section {
                    Section::Preamble => Section::Categories,
                    Section::Categories => Section::Vocabulary,
                    Section::Vocabulary => {
                        return Err(FeatureError::DictionaryEntry {
                            line: line_no,
                            message: "unexpected third section delimiter".to_string(),
                        })
                    }
                };
                continue;
            }

            match section {
                Section::Preamble => {
                    return Err(FeatureError::DictionaryEntry {
                        line: line_no,
                        message: format!(
                            "entry before the '{}' category header",
                            SECTION_DELIMITER
                        ),
                    })
                }
                Section::Categories => {
                    let fields: Vec<&str> = line.split('\t').collect();
                    if fields.len() != 2 || fields[0].trim().is_empty() {
                        return Err(FeatureError::DictionaryEntry {
                            line: line_no,
                            message: "expected 'key<TAB>label'".to_string(),
                        });
                    }
                    dictionary
                        .categories
                        .insert(fields[0].trim().to_string(), fields[1].trim().to_string());
                }
                Section::Vocabulary => {
                    let mut fields = line.split('\t');
                    let stem = fields.next().unwrap_or_default().trim();
                    if stem.is_empty() {
                        return Err(FeatureError::DictionaryEntry {
                            line: line_no,
                            message: "empty stem".to_string(),
                        });
                    }

                    let mut keys: Vec<String> = Vec::new();
                    for key in fields.map(str::trim).filter(|k| !k.is_empty()) {
                        if !keys.iter().any(|k| k == key) {
                            keys.push(key.to_string());
                        }
                    }

                    pending.push((line_no, keys.clone()));
                    dictionary.stems.push(Stem {
                        pattern: stem_pattern(stem)?,
                        keys,
                    });
                }
            }
        }

        for (line_no, keys) in pending {
            if let Some(key) = keys.iter().find(|k| !dictionary.categories.contains_key(*k)) {
                return Err(FeatureError::DictionaryEntry {
                    line: line_no,
                    message: format!("unknown category key '{}'", key),
                });
            }
        }

        Ok(dictionary)
    }

    /// Sorted, deduplicated category labels
    pub fn category_names(&self) -> Vec<String> {
        self.categories
            .values()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether any stem matches `word`
    pub fn has_match(&self, word: &str) -> bool {
        let word = canonical_word(word);
        self.stems.iter().any(|stem| stem.pattern.is_match(&word))
    }

    /// Labels of every category `word` falls in.
    ///
    /// A label appears once per matching stem, so a word matched by two stems
    /// of the same category yields that label twice.
    pub fn matching_categories(&self, word: &str) -> Vec<&str> {
        let word = canonical_word(word);
        self.stems
            .iter()
            .filter(|stem| stem.pattern.is_match(&word))
            .flat_map(|stem| stem.keys.iter())
            .filter_map(|key| self.categories.get(key).map(String::as_str))
            .collect()
    }

    /// Count of category matches over `tokens`, one entry per category name
    pub fn counts_by_category<S: AsRef<str>>(&self, tokens: &[S]) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> =
            self.category_names().into_iter().map(|name| (name, 0)).collect();

        for token in tokens {
            for label in self.matching_categories(token.as_ref()) {
                if let Some(count) = counts.get_mut(label) {
                    *count += 1;
                }
            }
        }

        counts
    }

    pub fn stem_count(&self) -> usize {
        self.stems.len()
    }
}

/// Lowercased word with non-word characters removed
fn canonical_word(word: &str) -> String {
    non_word_re()
        .replace_all(&word.trim().to_lowercase(), "")
        .into_owned()
}

/// Anchored pattern for a stem, where `*` matches any run of characters
fn stem_pattern(stem: &str) -> Result<Regex, FeatureError> {
    let body = stem
        .to_lowercase()
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Ok(Regex::new(&format!("^{}$", body))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "%\n1\tposemo\n2\tnegemo\n3\taffect\n%\nhapp*\t1\t3\nhate\t2\t3\nhat*\t2\nsad\t2\t3\n";

    #[test]
    fn test_category_names_sorted() {
        let dictionary = Dictionary::parse(SAMPLE).unwrap();
        assert_eq!(
            dictionary.category_names(),
            vec!["affect", "negemo", "posemo"]
        );
        assert_eq!(dictionary.stem_count(), 4);
    }

    #[test]
    fn test_category_names_independent_of_load_order() {
        let reordered = "%\n3\taffect\n2\tnegemo\n1\tposemo\n4\tposemo\n%\nhapp*\t1\t3\n";
        let a = Dictionary::parse(SAMPLE).unwrap();
        let b = Dictionary::parse(reordered).unwrap();
        assert_eq!(a.category_names(), b.category_names());
    }

    #[test]
    fn test_wildcard_matching() {
        let dictionary = Dictionary::parse(SAMPLE).unwrap();
        assert_eq!(dictionary.matching_categories("happy"), vec!["posemo", "affect"]);
        assert_eq!(dictionary.matching_categories("Happiness!"), vec!["posemo", "affect"]);
        assert!(dictionary.matching_categories("unhappy").is_empty());
        assert!(dictionary.has_match("happ"));
        assert!(!dictionary.has_match("glad"));
    }

    #[test]
    fn test_overlapping_stems_count_each_match() {
        let dictionary = Dictionary::parse(SAMPLE).unwrap();
        // "hate" matches both `hate` and `hat*`
        assert_eq!(
            dictionary.matching_categories("hate"),
            vec!["negemo", "affect", "negemo"]
        );
    }

    #[test]
    fn test_counts_by_category() {
        let dictionary = Dictionary::parse(SAMPLE).unwrap();
        let counts = dictionary.counts_by_category(&["so", "happy", "not", "sad"]);
        assert_eq!(counts["posemo"], 1);
        assert_eq!(counts["negemo"], 1);
        assert_eq!(counts["affect"], 2);

        let empty = dictionary.counts_by_category::<&str>(&[]);
        assert_eq!(empty.len(), 3);
        assert!(empty.values().all(|c| *c == 0));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let dictionary = Dictionary::parse("%\n1\tmisc\n%\na.b*\t1\n").unwrap();
        // `.` is not a wildcard inside a stem
        assert!(!dictionary.has_match("axb"));
        assert!(!dictionary.has_match("axbc"));
    }

    #[test]
    fn test_malformed_category_line() {
        let err = Dictionary::parse("%\n1 posemo\n%\n").unwrap_err();
        assert!(matches!(err, FeatureError::DictionaryEntry { line: 2, .. }));
    }

    #[test]
    fn test_unknown_category_key() {
        let err = Dictionary::parse("%\n1\tposemo\n%\ngood\t9\n").unwrap_err();
        assert!(matches!(err, FeatureError::DictionaryEntry { line: 4, .. }));
    }

    #[test]
    fn test_entry_before_header() {
        assert!(Dictionary::parse("good\t1\n%\n1\tposemo\n%\n").is_err());
    }

    #[test]
    fn test_third_delimiter_rejected() {
        assert!(Dictionary::parse("%\n1\tposemo\n%\ngood\t1\n%\n").is_err());
    }
}
