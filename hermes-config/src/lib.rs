//! Configuration for the Hermes telemetry client.
//!
//! The central type is [`Options`], which lists every recognized option of the client along with
//! its default. Options are usually built in code, but can also be loaded from YAML or JSON files
//! with [`Options::from_path`]:
//!
//! ```yaml
//! server: https://collector.example.com
//! appKey: "42"
//! sampleRate: 0.5
//! ignoreErrors:
//!   - ResizeObserver loop
//!   - regex: "^Network request failed$"
//! autoBreadcrumbs:
//!   sentry: true
//! ```
//!
//! Both the camelCase names shown above and snake_case names are accepted.

#![warn(missing_docs)]

mod config;
mod types;

pub use self::config::*;
pub use self::types::*;
