//! Scrubbing of sensitive values in event payloads.
//!
//! The [`Sanitizer`] replaces the values of all keys matching a configured [`PatternList`] with
//! the fixed marker [`REDACTION`]:
//!
//! ```
//! use hermes_common::{Pattern, PatternList};
//! use hermes_pii::{REDACTION, Sanitizer};
//! use hermes_protocol::Value;
//!
//! let sanitizer = Sanitizer::new(PatternList::new(vec![Pattern::from("password")]));
//!
//! let mut value = serde_json::json!({"user": {"password": "hunter2", "name": "jane"}});
//! sanitizer.sanitize_value(&mut value);
//!
//! assert_eq!(value["user"]["password"], Value::from(REDACTION));
//! assert_eq!(value["user"]["name"], Value::from("jane"));
//! ```
//!
//! [`PatternList`]: hermes_common::PatternList
#![warn(missing_docs)]

mod sanitizer;

pub use self::sanitizer::*;
