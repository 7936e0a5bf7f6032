use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Breadcrumb, Exception, Level, Object, Stacktrace, Value, Values};

/// Identifier of an event, formatted as 32 lowercase hex characters.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct EventId(pub uuid::Uuid);

impl EventId {
    /// Creates a new random event id using a UUID v4.
    #[inline]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for EventId {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_simple())
    }
}

impl FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(uuid_str: &str) -> Result<Self, Self::Err> {
        uuid_str.parse().map(EventId)
    }
}

impl Serialize for EventId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = <std::borrow::Cow<'_, str>>::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// Metadata about the page or process that produced the event.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Request {
    /// The URL of the page or resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Request headers, such as `User-Agent` and `Referer`.
    #[serde(skip_serializing_if = "Object::is_empty")]
    pub headers: Object<String>,
}

impl Request {
    /// Returns `true` if neither a URL nor headers are set.
    pub fn is_empty(&self) -> bool {
        self.url.is_none() && self.headers.is_empty()
    }
}

/// The event payload delivered to the collector.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Event {
    /// Unique identifier of this event, assigned right before sending.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,

    /// The captured message, or the exception value once the event is ready to send.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Severity of the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,

    /// Name of the logger that produced the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,

    /// The captured exception. Only the first value is populated by the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<Values<Exception>>,

    /// Synthetic stack trace of a message capture.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<Stacktrace>,

    /// URL of the file the event originated from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub culprit: Option<String>,

    /// Tags for grouping and searching events.
    #[serde(skip_serializing_if = "Object::is_empty")]
    pub tags: Object<String>,

    /// Arbitrary additional data.
    #[serde(skip_serializing_if = "Object::is_empty")]
    pub extra: Object<Value>,

    /// Information about the affected user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Object<Value>>,

    /// Breadcrumbs recorded before the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breadcrumbs: Option<Values<Breadcrumb>>,

    /// Grouping key overriding the collector's default grouping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Vec<String>>,

    /// The environment, for example `production`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Name of the host that produced the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    /// The configured user name of the reporting application.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Identifier of the reporting application.
    #[serde(rename = "appKey", skip_serializing_if = "Option::is_none")]
    pub app_key: Option<String>,

    /// Page or process metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<Request>,

    /// Exception type, copied from the exception right before sending.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,

    /// Line of the newest frame with a known line and column.
    #[serde(rename = "lineNo", skip_serializing_if = "Option::is_none")]
    pub line_no: Option<u64>,

    /// Column of the newest frame with a known line and column.
    #[serde(rename = "colNo", skip_serializing_if = "Option::is_none")]
    pub col_no: Option<u64>,

    /// File of the newest frame with a known line and column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

fn prune_string(value: &mut Option<String>) {
    if value.as_deref() == Some("") {
        *value = None;
    }
}

impl Event {
    /// Returns the first exception of this event.
    pub fn first_exception(&self) -> Option<&Exception> {
        self.exception.as_ref().and_then(Values::first)
    }

    /// Returns `true` if no field of the event is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Removes empty strings and empty objects from the top level of the event.
    pub fn prune_empty(&mut self) {
        prune_string(&mut self.message);
        prune_string(&mut self.logger);
        prune_string(&mut self.culprit);
        prune_string(&mut self.environment);
        prune_string(&mut self.server_name);
        prune_string(&mut self.username);
        prune_string(&mut self.app_key);
        prune_string(&mut self.ty);
        prune_string(&mut self.file);

        if self.user.as_ref().is_some_and(Object::is_empty) {
            self.user = None;
        }
        if self.request.as_ref().is_some_and(Request::is_empty) {
            self.request = None;
        }
        if self.breadcrumbs.as_ref().is_some_and(Values::is_empty) {
            self.breadcrumbs = None;
        }
        if self.exception.as_ref().is_some_and(Values::is_empty) {
            self.exception = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;
    use crate::Frame;

    #[test]
    fn test_event_id_format() {
        let id: EventId = "52df9022-8352-46ee-b317-dbd739ccd059".parse().unwrap();
        assert_eq!(id.to_string(), "52df9022835246eeb317dbd739ccd059");
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            r#""52df9022835246eeb317dbd739ccd059""#
        );

        let parsed: EventId = serde_json::from_str(r#""52df9022835246eeb317dbd739ccd059""#).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_empty_event_serializes_empty() {
        assert_eq!(serde_json::to_string(&Event::default()).unwrap(), "{}");
    }

    #[test]
    fn test_prune_empty() {
        let mut event = Event {
            message: Some(String::new()),
            culprit: Some("app.js".to_owned()),
            user: Some(Object::new()),
            request: Some(Request::default()),
            breadcrumbs: Some(Values::default()),
            ..Default::default()
        };

        event.prune_empty();

        assert_eq!(
            event,
            Event {
                culprit: Some("app.js".to_owned()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_exception_event_wire_format() {
        let event = Event {
            exception: Some(Values::new(vec![Exception {
                ty: Some("TypeError".to_owned()),
                value: Some("x is not a function".to_owned()),
                stacktrace: Some(Stacktrace::new(vec![Frame {
                    filename: Some("https://example.com/app.js".to_owned()),
                    lineno: Some(3),
                    colno: Some(14),
                    function: Some("render".to_owned()),
                    in_app: Some(true),
                }])),
            }])),
            culprit: Some("https://example.com/app.js".to_owned()),
            app_key: Some("42".to_owned()),
            line_no: Some(3),
            col_no: Some(14),
            ..Default::default()
        };

        insta::assert_json_snapshot!(event, @r###"
        {
          "exception": {
            "values": [
              {
                "type": "TypeError",
                "value": "x is not a function",
                "stacktrace": {
                  "frames": [
                    {
                      "filename": "https://example.com/app.js",
                      "lineno": 3,
                      "colno": 14,
                      "function": "render",
                      "in_app": true
                    }
                  ]
                }
              }
            ]
          },
          "culprit": "https://example.com/app.js",
          "appKey": "42",
          "lineNo": 3,
          "colNo": 14
        }
        "###);
    }
}
