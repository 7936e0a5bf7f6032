//! Event payloads as they are delivered to the collector.
//!
//! All types serialize to the JSON wire format of the collector. Optional fields and empty
//! containers are skipped during serialization, so a freshly constructed [`Event`] serializes to
//! an empty object.
#![warn(missing_docs)]

mod breadcrumb;
mod event;
mod exception;
mod stacktrace;
mod types;

pub use self::breadcrumb::*;
pub use self::event::*;
pub use self::exception::*;
pub use self::stacktrace::*;
pub use self::types::*;
