use std::sync::LazyLock;

use regex::Regex;

/// Function names of the client itself and of the capture machinery.
pub static CLIENT_FUNCTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?:Hermes|TraceKit)\. |
        \bhermes_[a-z]+:: |
        \bbacktrace::
    ",
    )
    .unwrap()
});

/// File names of the client's own bundle or sources.
pub static CLIENT_FILENAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        hermes\.(?:min\.)?js$ |
        (?:^|[/\\])hermes-[a-z]+[/\\]src[/\\]
    ",
    )
    .unwrap()
});
