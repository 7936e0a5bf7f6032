use serde::{Deserialize, Serialize};

/// Holds information about a single stacktrace frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Frame {
    /// The source file or script URL of the frame.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Line number within the source file, starting at 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineno: Option<u64>,

    /// Column number within the source file, starting at 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colno: Option<u64>,

    /// Name of the frame's function. `"?"` if unknown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,

    /// Whether this frame is attributed to application code.
    ///
    /// Frames of the telemetry client itself and frames outside of the configured include paths
    /// are never in-app.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_app: Option<bool>,
}

impl Frame {
    /// Returns `true` if both frames point to the same location in the same function.
    pub fn same_location(&self, other: &Self) -> bool {
        self.filename == other.filename
            && self.lineno == other.lineno
            && self.colno == other.colno
            && self.function == other.function
    }
}

/// A stack trace with frames ordered from oldest to newest.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Stacktrace {
    /// The frames of the trace, the newest (crashing) frame last.
    #[serde(default)]
    pub frames: Vec<Frame>,
}

impl Stacktrace {
    /// Creates a stack trace from frames ordered oldest to newest.
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }

    /// Returns the newest frame of the trace.
    pub fn newest(&self) -> Option<&Frame> {
        self.frames.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_skips_missing() {
        let frame = Frame {
            filename: Some("https://example.com/app.js".to_owned()),
            lineno: Some(10),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_string(&frame).unwrap(),
            r#"{"filename":"https://example.com/app.js","lineno":10}"#
        );
    }

    #[test]
    fn test_same_location_ignores_in_app() {
        let a = Frame {
            filename: Some("app.js".to_owned()),
            lineno: Some(1),
            colno: Some(2),
            function: Some("run".to_owned()),
            in_app: Some(true),
        };
        let b = Frame {
            in_app: Some(false),
            ..a.clone()
        };
        let c = Frame {
            colno: Some(3),
            ..a.clone()
        };

        assert!(a.same_location(&b));
        assert!(!a.same_location(&c));
    }
}
