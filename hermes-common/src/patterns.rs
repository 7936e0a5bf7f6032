//! Lists of string and regular expression patterns compiled into a single matcher.

use std::fmt;
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single entry of a [`PatternList`].
///
/// Literals match anywhere in the tested string. Regular expressions are used verbatim, so they
/// need explicit anchors to match whole strings.
///
/// In configuration files, plain strings are literals and `{ regex: "..." }` objects are
/// regular expressions.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pattern {
    /// A string that is matched literally.
    Literal(String),
    /// A regular expression.
    Regex {
        /// The source of the regular expression.
        regex: String,
    },
}

impl Pattern {
    /// Creates a regular expression pattern.
    pub fn regex(source: impl Into<String>) -> Self {
        Self::Regex {
            regex: source.into(),
        }
    }

    /// Returns the regular expression source of this pattern.
    fn source(&self) -> String {
        match self {
            Self::Literal(literal) => regex::escape(literal),
            Self::Regex { regex } => regex.clone(),
        }
    }
}

impl From<&str> for Pattern {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_owned())
    }
}

impl From<String> for Pattern {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

/// A list of patterns joined into one case-insensitive alternation.
///
/// The combined expression is compiled lazily on first use. Entries that are not valid regular
/// expressions are skipped.
#[derive(Clone, Default)]
pub struct PatternList {
    patterns: Vec<Pattern>,
    compiled: OnceLock<Option<Regex>>,
}

impl PatternList {
    /// Creates a new pattern list.
    pub fn new(patterns: Vec<Pattern>) -> Self {
        Self {
            patterns,
            compiled: OnceLock::new(),
        }
    }

    /// Creates a list without patterns, which never matches.
    pub const fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            compiled: OnceLock::new(),
        }
    }

    /// Returns `true` if the list contains no patterns.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Returns the configured patterns.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Appends a pattern and invalidates the compiled matcher.
    pub fn push(&mut self, pattern: impl Into<Pattern>) {
        self.patterns.push(pattern.into());
        self.compiled = OnceLock::new();
    }

    fn compiled(&self) -> Option<&Regex> {
        self.compiled
            .get_or_init(|| {
                let sources: Vec<_> = self
                    .patterns
                    .iter()
                    .map(Pattern::source)
                    .filter(|source| Regex::new(source).is_ok())
                    .collect();

                if sources.is_empty() {
                    return None;
                }

                RegexBuilder::new(&sources.join("|"))
                    .case_insensitive(true)
                    .build()
                    .ok()
            })
            .as_ref()
    }

    /// Returns `true` if any of the patterns match the given string.
    ///
    /// An empty list never matches.
    pub fn is_match<S>(&self, value: S) -> bool
    where
        S: AsRef<str>,
    {
        match self.compiled() {
            Some(regex) => regex.is_match(value.as_ref()),
            None => false,
        }
    }
}

impl fmt::Debug for PatternList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.patterns.fmt(f)
    }
}

impl PartialEq for PatternList {
    fn eq(&self, other: &Self) -> bool {
        self.patterns == other.patterns
    }
}

impl<P: Into<Pattern>> FromIterator<P> for PatternList {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

impl Serialize for PatternList {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.patterns.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PatternList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let patterns = Deserialize::deserialize(deserializer)?;
        Ok(PatternList::new(patterns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! patterns {
        ($($pattern:expr),*) => {
            PatternList::new(vec![
                $(Pattern::from($pattern)),*
            ])
        };
    }

    #[test]
    fn test_match_empty_list() {
        let patterns = PatternList::default();
        assert!(!patterns.is_match("foo"));
        assert!(!patterns.is_match(""));
    }

    #[test]
    fn test_match_literal_substring() {
        let patterns = patterns!("bar");
        assert!(patterns.is_match("foobarblub"));
        assert!(!patterns.is_match("nope"));
    }

    #[test]
    fn test_literal_is_escaped() {
        let patterns = patterns!("app.min.js");
        assert!(patterns.is_match("https://example.com/app.min.js"));
        assert!(!patterns.is_match("https://example.com/appxminxjs"));
    }

    #[test]
    fn test_match_case_insensitive() {
        let patterns = patterns!("Script Error");
        assert!(patterns.is_match("script error."));
    }

    #[test]
    fn test_match_regex() {
        let patterns = PatternList::new(vec![Pattern::regex(r"^Script error\.?$")]);
        assert!(patterns.is_match("Script error."));
        assert!(!patterns.is_match("Uncaught Script error. in app"));
    }

    #[test]
    fn test_match_any() {
        let patterns = PatternList::new(vec![
            Pattern::from("chrome-extension://"),
            Pattern::regex(r"^https?://cdn\."),
        ]);
        assert!(patterns.is_match("chrome-extension://abc/content.js"));
        assert!(patterns.is_match("https://cdn.example.com/lib.js"));
        assert!(!patterns.is_match("https://example.com/app.js"));
    }

    #[test]
    fn test_invalid_regex_skipped() {
        let patterns = PatternList::new(vec![Pattern::regex("(unclosed"), Pattern::from("ok")]);
        assert!(patterns.is_match("ok then"));
        assert!(!patterns.is_match("(unclosed"));
    }

    #[test]
    fn test_push_recompiles() {
        let mut patterns = patterns!("foo");
        assert!(!patterns.is_match("bar"));
        patterns.push("bar");
        assert!(patterns.is_match("bar"));
    }

    #[test]
    fn test_deserialize_mixed() {
        let patterns: PatternList =
            serde_json::from_str(r#"["foo", {"regex": "^bar$"}]"#).unwrap();
        assert_eq!(
            patterns.patterns(),
            &[Pattern::from("foo"), Pattern::regex("^bar$")]
        );
        assert!(patterns.is_match("BAR"));
    }
}
