use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Arbitrary JSON values used in free-form payload sections.
pub use serde_json::Value;

/// A map with string keys, used for tags, extra data and user context.
pub type Object<T> = BTreeMap<String, T>;

/// A list wrapped in an object with a single `values` key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Values<T> {
    /// The wrapped values.
    #[serde(default)]
    pub values: Vec<T>,
}

impl<T> Values<T> {
    /// Creates a new values wrapper.
    pub fn new(values: Vec<T>) -> Self {
        Self { values }
    }

    /// Returns `true` if there are no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the first value, if any.
    pub fn first(&self) -> Option<&T> {
        self.values.first()
    }

    /// Returns the first value mutably, if any.
    pub fn first_mut(&mut self) -> Option<&mut T> {
        self.values.first_mut()
    }
}

/// Severity level of an event or breadcrumb.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Diagnostic information.
    Debug,
    /// Informational messages.
    Info,
    /// A warning.
    #[serde(alias = "warn")]
    Warning,
    /// An error, the default for captured exceptions.
    #[default]
    Error,
    /// A crash.
    Fatal,
}

impl Level {
    /// Returns the wire name of this level.
    pub fn name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An error parsing a [`Level`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseLevelError;

impl fmt::Display for ParseLevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid level")
    }
}

impl std::error::Error for ParseLevelError {}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "debug" | "log" => Self::Debug,
            "info" => Self::Info,
            "warning" | "warn" => Self::Warning,
            "error" => Self::Error,
            "fatal" => Self::Fatal,
            _ => return Err(ParseLevelError),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_console_names() {
        assert_eq!("warn".parse(), Ok(Level::Warning));
        assert_eq!("log".parse(), Ok(Level::Debug));
        assert_eq!("verbose".parse::<Level>(), Err(ParseLevelError));
    }

    #[test]
    fn test_level_serde() {
        let level: Level = serde_json::from_str(r#""warn""#).unwrap();
        assert_eq!(level, Level::Warning);
        assert_eq!(serde_json::to_string(&level).unwrap(), r#""warning""#);
    }
}
