//! Inputs of the capture entry points.

use std::error::Error;

use hermes_normalization::RawStacktrace;
use hermes_protocol::{EventId, Level, Object, Value};

/// Maximum length of the key list in messages of plain object captures.
const MAX_SERIALIZE_KEYS_LENGTH: usize = 40;

/// Maximum length of strings in serialized plain objects.
const MAX_SERIALIZE_VALUE_LENGTH: usize = 40;

/// Initial nesting depth of serialized plain objects.
const MAX_SERIALIZE_EXCEPTION_DEPTH: usize = 3;

/// Maximum size of serialized plain objects in bytes.
const MAX_SERIALIZE_EXCEPTION_SIZE: usize = 50 * 1024;

/// An error with its stack, as captured by instrumentation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawException {
    /// Name of the error type, such as `TypeError`.
    pub name: String,
    /// The error message.
    pub message: String,
    /// The stack at the point the error was raised.
    pub stack: RawStacktrace,
}

impl RawException {
    /// Creates an exception without stack information.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: RawStacktrace::default(),
        }
    }

    /// Attaches a stack to the exception.
    pub fn with_stacktrace(mut self, stack: RawStacktrace) -> Self {
        self.stack = stack;
        self
    }

    /// Creates an exception from a Rust error.
    ///
    /// The name is the unqualified type name of the error. The stack is captured at the call site.
    pub fn from_error<E: Error>(error: &E) -> Self {
        Self {
            name: short_type_name::<E>().to_owned(),
            message: error.to_string(),
            stack: RawStacktrace::capture(),
        }
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let name = std::any::type_name::<T>();
    let path = name.split('<').next().unwrap_or(name);
    path.rsplit("::").next().unwrap_or(path)
}

/// The value passed to [`Client::capture_exception`](crate::Client::capture_exception).
#[derive(Clone, Debug, PartialEq)]
pub enum ExceptionValue {
    /// An actual error.
    Error(RawException),
    /// A map that was raised instead of an error.
    PlainObject(Object<Value>),
    /// Any other value, captured as a message.
    Other(String),
}

impl From<RawException> for ExceptionValue {
    fn from(exception: RawException) -> Self {
        Self::Error(exception)
    }
}

impl From<Object<Value>> for ExceptionValue {
    fn from(object: Object<Value>) -> Self {
        Self::PlainObject(object)
    }
}

impl From<String> for ExceptionValue {
    fn from(value: String) -> Self {
        Self::Other(value)
    }
}

impl From<&str> for ExceptionValue {
    fn from(value: &str) -> Self {
        Self::Other(value.to_owned())
    }
}

/// Per-capture options that override the global context.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CaptureOptions {
    /// Number of newest frames that are marked as not in-app.
    pub trim_head_frames: usize,
    /// Custom grouping fingerprint.
    pub fingerprint: Option<Vec<String>>,
    /// Additional data, merged over the global context.
    pub extra: Object<Value>,
    /// Tags, merged over the global context.
    pub tags: Object<String>,
    /// The user, used instead of the global user.
    pub user: Option<Object<Value>>,
    /// Forces a synthetic stack trace for message captures.
    pub stacktrace: Option<bool>,
    /// Severity of the event.
    pub level: Option<Level>,
    /// Name of the logger that captured the event.
    pub logger: Option<String>,
    /// Overrides the culprit derived from the stack.
    pub culprit: Option<String>,
    /// A predefined event identifier.
    pub event_id: Option<EventId>,
}

impl CaptureOptions {
    /// Sets the fingerprint from a single string or a list of strings.
    pub fn with_fingerprint<I, S>(mut self, fingerprint: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fingerprint = Some(fingerprint.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the severity.
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Adds an extra value.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Adds a tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// What a [`CaptureRequest`] reports.
#[derive(Clone, Debug, PartialEq)]
pub enum CaptureKind {
    /// An error with its stack.
    Exception(RawException),
    /// A plain message.
    Message(String),
    /// A map that was raised instead of an error.
    PlainObject(Object<Value>),
}

/// A capture submitted by instrumentation through [`Client::capture`](crate::Client::capture).
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureRequest {
    /// The reported value.
    pub kind: CaptureKind,
    /// Options of this capture.
    pub options: CaptureOptions,
}

impl CaptureRequest {
    /// Creates an exception capture.
    pub fn exception(exception: RawException) -> Self {
        Self::new(CaptureKind::Exception(exception))
    }

    /// Creates a message capture.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(CaptureKind::Message(message.into()))
    }

    /// Creates a plain object capture.
    pub fn plain_object(object: Object<Value>) -> Self {
        Self::new(CaptureKind::PlainObject(object))
    }

    /// Replaces the capture options.
    pub fn with_options(mut self, options: CaptureOptions) -> Self {
        self.options = options;
        self
    }

    fn new(kind: CaptureKind) -> Self {
        Self {
            kind,
            options: CaptureOptions::default(),
        }
    }
}

/// Lists sorted keys for the message of a plain object capture.
///
/// Keys are joined with `", "` as long as the result fits 40 characters. If keys had to be left
/// out, an ellipsis is appended. A first key longer than the limit is returned on its own.
pub fn serialize_keys_for_message(keys: &[&str]) -> String {
    let Some(first) = keys.first() else {
        return "[object has no keys]".to_owned();
    };

    if first.chars().count() >= MAX_SERIALIZE_KEYS_LENGTH {
        return (*first).to_owned();
    }

    for used in (1..=keys.len()).rev() {
        let serialized = keys[..used].join(", ");
        if serialized.chars().count() > MAX_SERIALIZE_KEYS_LENGTH {
            continue;
        }
        if used == keys.len() {
            return serialized;
        }
        return serialized + "\u{2026}";
    }

    String::new()
}

/// Computes the grouping fingerprint of a plain object from its sorted keys.
pub fn keys_fingerprint(keys: &[&str]) -> String {
    format!("{:x}", md5::compute(keys.join(",")))
}

/// Serializes a plain object for inclusion in the event's additional data.
///
/// Nesting is cut at a depth of three. If the result exceeds 50KiB, the depth is reduced until it
/// fits.
pub fn serialize_exception(object: &Object<Value>) -> Value {
    let value = Value::Object(object.clone().into_iter().collect());

    let mut depth = MAX_SERIALIZE_EXCEPTION_DEPTH;
    loop {
        let serialized = serialize_object(&value, depth);
        let size = serde_json::to_string(&serialized).map_or(0, |json| json.len());
        if size <= MAX_SERIALIZE_EXCEPTION_SIZE || depth == 0 {
            return serialized;
        }
        depth -= 1;
    }
}

fn serialize_object(value: &Value, depth: usize) -> Value {
    if depth == 0 {
        return serialize_value(value);
    }

    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), serialize_object(value, depth - 1)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| serialize_object(item, depth - 1))
                .collect(),
        ),
        _ => serialize_value(value),
    }
}

fn serialize_value(value: &Value) -> Value {
    match value {
        Value::String(s) if s.chars().count() > MAX_SERIALIZE_VALUE_LENGTH => {
            let mut truncated: String = s.chars().take(MAX_SERIALIZE_VALUE_LENGTH).collect();
            truncated.push('\u{2026}');
            Value::String(truncated)
        }
        Value::Object(_) => Value::String("[Object]".to_owned()),
        Value::Array(_) => Value::String("[Array]".to_owned()),
        _ => value.clone(),
    }
}
