use hermes_common::{DEFAULT_STACK_TRACE_LIMIT, PatternList};
use hermes_protocol::Frame;
use serde::{Deserialize, Serialize};

use crate::regexes::{CLIENT_FILENAME_REGEX, CLIENT_FUNCTION_REGEX};

/// A single frame as reported by the capturing environment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFrame {
    /// URL or path of the source file.
    pub url: Option<String>,
    /// Name of the function, if known.
    pub func: Option<String>,
    /// Line number, starting at 1.
    pub line: Option<u64>,
    /// Column number, starting at 1.
    pub column: Option<u64>,
}

/// A stack as reported by the capturing environment, newest frame first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawStacktrace {
    /// The URL that reported the error, used for frames without a URL of their own.
    pub url: Option<String>,
    /// Line reported along with the URL when no frames are available.
    pub lineno: Option<u64>,
    /// Frames ordered from newest to oldest.
    pub frames: Vec<RawFrame>,
}

impl RawStacktrace {
    /// Captures a synthetic trace of the current thread.
    ///
    /// Frames of the unwinding machinery are skipped, so the newest frame is the caller of this
    /// function. Symbols are resolved eagerly, which is slow; use only for explicit captures.
    pub fn capture() -> Self {
        let mut frames = Vec::new();

        backtrace::trace(|frame| {
            backtrace::resolve_frame(frame, |symbol| {
                let func = symbol.name().map(|name| format!("{name:#}"));
                if func.as_deref().is_some_and(|f| f.starts_with("backtrace::")) {
                    return;
                }

                frames.push(RawFrame {
                    url: symbol
                        .filename()
                        .map(|path| path.to_string_lossy().into_owned()),
                    func,
                    line: symbol.lineno().map(u64::from),
                    column: symbol.colno().map(u64::from),
                });
            });
            true
        });

        Self {
            url: None,
            lineno: None,
            frames,
        }
    }

    /// Returns the newest frame.
    pub fn newest(&self) -> Option<&RawFrame> {
        self.frames.first()
    }
}

/// Converts raw stacks into protocol frames.
#[derive(Debug)]
pub struct StacktraceNormalizer<'a> {
    include_paths: &'a PatternList,
    stack_trace_limit: usize,
}

impl<'a> StacktraceNormalizer<'a> {
    /// Creates a normalizer.
    ///
    /// When `include_paths` is non-empty, only frames with a matching file name are in-app.
    pub fn new(include_paths: &'a PatternList, stack_trace_limit: usize) -> Self {
        Self {
            include_paths,
            stack_trace_limit,
        }
    }

    /// Normalizes a single frame. `stack_url` is used when the frame has no URL.
    pub fn normalize_frame(&self, frame: &RawFrame, stack_url: Option<&str>) -> Frame {
        let filename = frame.url.as_deref().or(stack_url).map(str::to_owned);
        let function = frame.func.clone().unwrap_or_else(|| "?".to_owned());

        let filename_str = filename.as_deref().unwrap_or_default();
        let excluded = !self.include_paths.is_empty() && !self.include_paths.is_match(filename_str);
        let in_app = !(excluded
            || CLIENT_FUNCTION_REGEX.is_match(&function)
            || CLIENT_FILENAME_REGEX.is_match(filename_str));

        Frame {
            filename,
            lineno: frame.line,
            colno: frame.column,
            function: Some(function),
            in_app: Some(in_app),
        }
    }

    /// Normalizes all frames of the stack, keeping the newest-first order.
    ///
    /// The first `trim_head_frames` frames are marked as not in-app. Frames exceeding the stack
    /// trace limit are dropped from the oldest end.
    pub fn normalize(&self, stack: &RawStacktrace, trim_head_frames: usize) -> Vec<Frame> {
        let mut frames: Vec<Frame> = stack
            .frames
            .iter()
            .map(|frame| self.normalize_frame(frame, stack.url.as_deref()))
            .collect();

        for frame in frames.iter_mut().take(trim_head_frames) {
            frame.in_app = Some(false);
        }

        frames.truncate(self.stack_trace_limit);
        frames
    }
}

impl Default for StacktraceNormalizer<'static> {
    fn default() -> Self {
        static EMPTY: PatternList = PatternList::empty();
        Self::new(&EMPTY, DEFAULT_STACK_TRACE_LIMIT)
    }
}
