//! Normalization of captured stack traces and size limits for outgoing payloads.
//!
//! - [`StacktraceNormalizer`] turns raw captured stacks into protocol [`Frame`]s, deciding which
//!   frames belong to the application.
//! - [`trim_event`] bounds the length of messages and URL-shaped values before sending.
//!
//! [`Frame`]: hermes_protocol::Frame
#![warn(missing_docs)]

mod regexes;
mod stacktrace;
mod trimming;

pub use self::stacktrace::*;
pub use self::trimming::*;
