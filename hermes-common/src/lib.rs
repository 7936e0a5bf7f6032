//! Common functionality for the Hermes telemetry client.
#![warn(missing_docs)]

mod constants;
mod patterns;
mod time;

pub use crate::constants::*;
pub use crate::patterns::*;
pub use crate::time::*;
