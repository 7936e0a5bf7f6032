use serde::{Deserialize, Serialize};

use crate::{EventId, Level, Object, Value};

/// A timestamped record explaining the lead-up to an event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Breadcrumb {
    /// Seconds since the UNIX epoch. Filled in on capture if missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,

    /// The type of the breadcrumb.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,

    /// The category, for example `ui.click` or `navigation`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Severity level of the breadcrumb.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,

    /// Human readable message for the breadcrumb.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Custom structured data of this breadcrumb.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Object<Value>>,

    /// Identifier of the event this breadcrumb refers to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,

    /// Additional arbitrary fields for forwards compatibility.
    #[serde(flatten)]
    pub other: Object<Value>,
}

impl Breadcrumb {
    /// Returns `true` if no field of the breadcrumb is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_breadcrumb_roundtrip() {
        let input = r#"{
  "timestamp": 946684800.5,
  "type": "navigation",
  "category": "navigation",
  "level": "info",
  "data": {
    "from": "/a",
    "to": "/b"
  },
  "c": "d"
}"#;

        let breadcrumb: Breadcrumb = serde_json::from_str(input).unwrap();
        assert_eq!(breadcrumb.timestamp, Some(946684800.5));
        assert_eq!(breadcrumb.level, Some(Level::Info));
        assert_eq!(breadcrumb.other.get("c"), Some(&Value::from("d")));
        assert_eq!(serde_json::to_string_pretty(&breadcrumb).unwrap(), input);
    }

    #[test]
    fn test_is_empty() {
        assert!(Breadcrumb::default().is_empty());
        let crumb = Breadcrumb {
            message: Some("clicked".to_owned()),
            ..Default::default()
        };
        assert!(!crumb.is_empty());
    }
}
