use hermes_common::PatternList;
use hermes_protocol::{Breadcrumb, Event, Exception, Frame, Object, Request, Stacktrace, Value};

/// The marker that replaces sanitized values.
pub const REDACTION: &str = "********";

/// Replaces values of sensitive keys in payloads.
///
/// Free-form data, such as `extra`, `user` and breadcrumb data, is scrubbed recursively and any
/// matching value is replaced with [`REDACTION`]. Typed fields of the event are matched by their
/// wire name: string fields are replaced with the marker, all other fields are removed.
///
/// Sanitizing is idempotent.
#[derive(Clone, Debug, Default)]
pub struct Sanitizer {
    keys: PatternList,
}

impl Sanitizer {
    /// Creates a sanitizer for the given key patterns.
    pub fn new(keys: PatternList) -> Self {
        Self { keys }
    }

    /// Returns `true` if the value of the given key would be sanitized.
    pub fn is_sensitive(&self, key: &str) -> bool {
        self.keys.is_match(key)
    }

    /// Sanitizes a free-form value recursively.
    pub fn sanitize_value(&self, value: &mut Value) {
        if self.keys.is_empty() {
            return;
        }

        match value {
            Value::Object(map) => {
                for (key, value) in map.iter_mut() {
                    if self.is_sensitive(key) {
                        *value = Value::String(REDACTION.to_owned());
                    } else {
                        self.sanitize_value(value);
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.sanitize_value(item);
                }
            }
            _ => (),
        }
    }

    /// Sanitizes a free-form object recursively.
    pub fn sanitize_object(&self, object: &mut Object<Value>) {
        if self.keys.is_empty() {
            return;
        }

        for (key, value) in object.iter_mut() {
            if self.is_sensitive(key) {
                *value = Value::String(REDACTION.to_owned());
            } else {
                self.sanitize_value(value);
            }
        }
    }

    /// Sanitizes all fields of the event.
    pub fn sanitize_event(&self, event: &mut Event) {
        if self.keys.is_empty() {
            return;
        }

        self.mask("message", &mut event.message);
        self.mask("logger", &mut event.logger);
        self.mask("culprit", &mut event.culprit);
        self.mask("environment", &mut event.environment);
        self.mask("server_name", &mut event.server_name);
        self.mask("username", &mut event.username);
        self.mask("appKey", &mut event.app_key);
        self.mask("type", &mut event.ty);
        self.mask("file", &mut event.file);

        self.remove("event_id", &mut event.event_id);
        self.remove("level", &mut event.level);
        self.remove("fingerprint", &mut event.fingerprint);
        self.remove("lineNo", &mut event.line_no);
        self.remove("colNo", &mut event.col_no);

        if self.is_sensitive("tags") {
            event.tags.clear();
        } else {
            self.sanitize_tags(&mut event.tags);
        }

        if self.is_sensitive("extra") {
            event.extra.clear();
        } else {
            self.sanitize_object(&mut event.extra);
        }

        if !self.remove("user", &mut event.user) {
            if let Some(user) = &mut event.user {
                self.sanitize_object(user);
            }
        }

        if !self.remove("request", &mut event.request) {
            if let Some(request) = &mut event.request {
                self.sanitize_request(request);
            }
        }

        if !self.remove("stacktrace", &mut event.stacktrace) {
            if let Some(stacktrace) = &mut event.stacktrace {
                self.sanitize_stacktrace(stacktrace);
            }
        }

        if !self.remove("exception", &mut event.exception) && self.is_sensitive("values") {
            event.exception = None;
        }
        if let Some(exception) = &mut event.exception {
            for exception in &mut exception.values {
                self.sanitize_exception(exception);
            }
        }

        if !self.remove("breadcrumbs", &mut event.breadcrumbs) && self.is_sensitive("values") {
            event.breadcrumbs = None;
        }
        if let Some(breadcrumbs) = &mut event.breadcrumbs {
            for crumb in &mut breadcrumbs.values {
                self.sanitize_breadcrumb(crumb);
            }
        }
    }

    /// Sanitizes a breadcrumb.
    pub fn sanitize_breadcrumb(&self, crumb: &mut Breadcrumb) {
        if self.keys.is_empty() {
            return;
        }

        self.mask("type", &mut crumb.ty);
        self.mask("category", &mut crumb.category);
        self.mask("message", &mut crumb.message);
        self.remove("timestamp", &mut crumb.timestamp);
        self.remove("level", &mut crumb.level);
        self.remove("event_id", &mut crumb.event_id);

        if !self.remove("data", &mut crumb.data) {
            if let Some(data) = &mut crumb.data {
                self.sanitize_object(data);
            }
        }

        self.sanitize_object(&mut crumb.other);
    }

    fn sanitize_tags(&self, tags: &mut Object<String>) {
        for (key, value) in tags.iter_mut() {
            if self.is_sensitive(key) {
                REDACTION.clone_into(value);
            }
        }
    }

    fn sanitize_request(&self, request: &mut Request) {
        self.mask("url", &mut request.url);

        if self.is_sensitive("headers") {
            request.headers.clear();
        } else {
            self.sanitize_tags(&mut request.headers);
        }
    }

    fn sanitize_exception(&self, exception: &mut Exception) {
        self.mask("type", &mut exception.ty);
        self.mask("value", &mut exception.value);

        if !self.remove("stacktrace", &mut exception.stacktrace) {
            if let Some(stacktrace) = &mut exception.stacktrace {
                self.sanitize_stacktrace(stacktrace);
            }
        }
    }

    fn sanitize_stacktrace(&self, stacktrace: &mut Stacktrace) {
        if self.is_sensitive("frames") {
            stacktrace.frames.clear();
            return;
        }

        for frame in &mut stacktrace.frames {
            self.sanitize_frame(frame);
        }
    }

    fn sanitize_frame(&self, frame: &mut Frame) {
        self.mask("filename", &mut frame.filename);
        self.mask("function", &mut frame.function);
        self.remove("lineno", &mut frame.lineno);
        self.remove("colno", &mut frame.colno);
        self.remove("in_app", &mut frame.in_app);
    }

    /// Replaces a present string field with the redaction marker if its name matches.
    fn mask(&self, name: &str, field: &mut Option<String>) {
        if field.is_some() && self.is_sensitive(name) {
            *field = Some(REDACTION.to_owned());
        }
    }

    /// Removes a field if its name matches. Returns `true` if the field was matched.
    fn remove<T>(&self, name: &str, field: &mut Option<T>) -> bool {
        if self.is_sensitive(name) {
            *field = None;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use hermes_common::Pattern;
    use hermes_protocol::{EventId, Level, Values};
    use serde_json::json;
    use similar_asserts::assert_eq;

    use super::*;

    fn sanitizer(patterns: Vec<Pattern>) -> Sanitizer {
        Sanitizer::new(PatternList::new(patterns))
    }

    #[test]
    fn test_empty_keys_noop() {
        let sanitizer = Sanitizer::default();
        let mut value = json!({"password": "hunter2"});
        sanitizer.sanitize_value(&mut value);
        assert_eq!(value, json!({"password": "hunter2"}));
    }

    #[test]
    fn test_sanitize_nested() {
        let sanitizer = sanitizer(vec![Pattern::from("password"), Pattern::regex("^token$")]);

        let mut value = json!({
            "password": "hunter2",
            "nested": {
                "old_password": {"deep": "value"},
                "token": 12345,
                "tokens": ["a", "b"],
            },
            "list": [{"PASSWORD": "x"}, "password"],
        });

        sanitizer.sanitize_value(&mut value);

        assert_eq!(
            value,
            json!({
                "password": "********",
                "nested": {
                    "old_password": "********",
                    "token": "********",
                    "tokens": ["a", "b"],
                },
                "list": [{"PASSWORD": "********"}, "password"],
            })
        );
    }

    #[test]
    fn test_sanitize_idempotent() {
        let sanitizer = sanitizer(vec![Pattern::from("secret"), Pattern::from("lineno")]);

        let mut event = Event {
            message: Some("hello".to_owned()),
            extra: [
                ("secret".to_owned(), json!({"a": 1})),
                ("public".to_owned(), json!({"my_secret": [1, 2]})),
            ]
            .into(),
            exception: Some(Values::new(vec![Exception {
                ty: Some("Error".to_owned()),
                value: Some("boom".to_owned()),
                stacktrace: Some(Stacktrace::new(vec![Frame {
                    filename: Some("app.js".to_owned()),
                    lineno: Some(1),
                    ..Default::default()
                }])),
            }])),
            ..Default::default()
        };

        sanitizer.sanitize_event(&mut event);
        let once = event.clone();
        sanitizer.sanitize_event(&mut event);

        assert_eq!(event, once);
        assert_eq!(once.extra["secret"], json!("********"));
        assert_eq!(once.extra["public"], json!({"my_secret": "********"}));

        let frame = &once.first_exception().unwrap().stacktrace.as_ref().unwrap().frames[0];
        assert_eq!(frame.lineno, None);
        assert_eq!(frame.filename.as_deref(), Some("app.js"));
    }

    #[test]
    fn test_sanitize_event_fields() {
        let sanitizer = sanitizer(vec![
            Pattern::regex("^username$"),
            Pattern::regex("^level$"),
            Pattern::from("cookie"),
            Pattern::from("email"),
        ]);

        let mut headers = Object::new();
        headers.insert("Cookie".to_owned(), "session=1".to_owned());
        headers.insert("User-Agent".to_owned(), "test".to_owned());

        let mut event = Event {
            event_id: Some(EventId::new()),
            username: Some("jane".to_owned()),
            level: Some(Level::Warning),
            tags: [("email".to_owned(), "jane@example.com".to_owned())].into(),
            user: Some([("email".to_owned(), json!("jane@example.com"))].into()),
            request: Some(Request {
                url: Some("https://example.com".to_owned()),
                headers,
            }),
            breadcrumbs: Some(Values::new(vec![Breadcrumb {
                message: Some("clicked".to_owned()),
                level: Some(Level::Info),
                data: Some([("email".to_owned(), json!("x@example.com"))].into()),
                ..Default::default()
            }])),
            ..Default::default()
        };

        sanitizer.sanitize_event(&mut event);

        assert_eq!(event.username.as_deref(), Some(REDACTION));
        assert_eq!(event.level, None);
        assert!(event.event_id.is_some());
        assert_eq!(event.tags["email"], REDACTION);
        assert_eq!(event.user.as_ref().unwrap()["email"], json!(REDACTION));

        let request = event.request.as_ref().unwrap();
        assert_eq!(request.headers["Cookie"], REDACTION);
        assert_eq!(request.headers["User-Agent"], "test");

        let crumb = &event.breadcrumbs.as_ref().unwrap().values[0];
        assert_eq!(crumb.level, None);
        assert_eq!(crumb.message.as_deref(), Some("clicked"));
        assert_eq!(crumb.data.as_ref().unwrap()["email"], json!(REDACTION));
    }

    #[test]
    fn test_sanitize_container_key() {
        let sanitizer = sanitizer(vec![Pattern::regex("^extra$")]);

        let mut event = Event {
            extra: [("a".to_owned(), json!(1))].into(),
            ..Default::default()
        };

        sanitizer.sanitize_event(&mut event);
        assert!(event.extra.is_empty());
    }

    #[test]
    fn test_sanitized_payload_snapshot() {
        let sanitizer = sanitizer(vec![Pattern::from("password")]);

        let mut event = Event {
            message: Some("login failed".to_owned()),
            extra: [(
                "form".to_owned(),
                json!({"user": "jane", "password": "hunter2"}),
            )]
            .into(),
            ..Default::default()
        };

        sanitizer.sanitize_event(&mut event);

        insta::assert_json_snapshot!(event, @r###"
        {
          "message": "login failed",
          "extra": {
            "form": {
              "password": "********",
              "user": "jane"
            }
          }
        }
        "###);
    }
}
