//! Error and event telemetry client.
//!
//! The [`Client`] accepts exceptions, messages and breadcrumbs from instrumentation and delivers
//! them to a remote collector. Every capture runs through the same pipeline:
//!
//! 1. The global context, breadcrumbs and request metadata are merged into the event.
//! 2. Sensitive values are scrubbed and long strings are truncated.
//! 3. Data and should-send callbacks may replace or decline the event.
//! 4. Events are dropped while the collector requested a backoff, when they lose the sampling
//!    draw, or when they repeat the last event that was sent.
//! 5. The event is handed to the [`Transport`] and the outcome updates the backoff state.
//!
//! Capture methods never fail. They return a [`SendOutcome`] describing what happened to the
//! event, and report delivery through [`Notification`]s.
//!
//! # Example
//!
//! ```no_run
//! # async fn run() -> Result<(), hermes_config::ConfigError> {
//! use hermes_client::{CaptureOptions, Client};
//! use hermes_config::Options;
//!
//! let options = Options::from_path("hermes.yml")?;
//! let client = Client::new(options);
//! client.set_username(Some("jane"));
//! client.install();
//!
//! client
//!     .capture_message("checkout failed", CaptureOptions::default())
//!     .await;
//! # Ok(())
//! # }
//! ```
#![warn(missing_docs)]

mod backoff;
mod breadcrumbs;
mod capture;
mod client;
mod context;
mod dedup;
mod identity;
mod integration;
mod notify;
mod pipeline;
mod sampling;

pub mod transport;

pub use self::backoff::BackoffController;
pub use self::breadcrumbs::{BreadcrumbAction, BreadcrumbBuffer, BreadcrumbCallback};
pub use self::capture::*;
pub use self::client::*;
pub use self::context::GlobalContext;
pub use self::dedup::{DedupKey, is_repeat};
pub use self::identity::{ANONYMOUS, obfuscate_username};
pub use self::integration::Integration;
pub use self::notify::Notification;
pub use self::pipeline::{DataCallback, DropReason, SendOutcome, ShouldSendCallback};
pub use self::sampling::Sampler;
pub use self::transport::{Transport, TransportError, TransportRequest};
