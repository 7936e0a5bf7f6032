//! Delivery of payloads to the collector.
//!
//! A [`Transport`] sends a single [`TransportRequest`] and reports whether the collector accepted
//! it. The built-in transports model the delivery mechanisms of different hosts:
//!
//! - [`FetchTransport`] accepts any successful status and exposes the response.
//! - [`XhrTransport`] accepts only status 200.
//! - [`LegacyTransport`] sends without custom headers and cannot observe failure details.
//!
//! [`negotiate`] picks the first mechanism the host supports.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use hermes_protocol::{Event, Object};

mod http;
mod negotiate;

pub use self::http::*;
pub use self::negotiate::*;

/// A payload on its way to the collector.
#[derive(Clone, Debug)]
pub struct TransportRequest {
    /// The endpoint to send the payload to.
    pub url: String,
    /// The processed event. Shared with notifications.
    pub event: Arc<Event>,
    /// Headers to attach to the request.
    pub headers: Object<String>,
}

/// An error returned by [`Transport::send`].
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request could not be sent or the response could not be read.
    #[error("could not send request")]
    Network(#[from] reqwest::Error),

    /// The collector rejected the payload.
    #[error("collector responded with status {status}")]
    Status {
        /// The HTTP status code of the response.
        status: u16,
        /// The value of the `Retry-After` header, if present.
        retry_after: Option<String>,
    },

    /// The request failed without details about the response.
    #[error("request failed without details")]
    Opaque,

    /// The payload could not be serialized.
    #[error("could not serialize payload")]
    Serialize(#[from] serde_json::Error),
}

impl TransportError {
    /// Returns the HTTP status code, if the transport observed one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network(error) => error.status().map(|status| status.as_u16()),
            Self::Status { status, .. } => Some(*status),
            Self::Opaque | Self::Serialize(_) => None,
        }
    }

    /// Returns the `Retry-After` header sent along with an error response.
    pub fn retry_after(&self) -> Option<&str> {
        match self {
            Self::Status { retry_after, .. } => retry_after.as_deref(),
            _ => None,
        }
    }
}

/// A delivery mechanism for payloads.
///
/// Implement this trait to replace the built-in HTTP delivery with
/// [`Client::set_transport`](crate::Client::set_transport).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends the payload and resolves once the collector responded.
    async fn send(&self, request: TransportRequest) -> Result<(), TransportError>;

    /// Returns a short name of the mechanism for logging.
    fn name(&self) -> &'static str {
        "custom"
    }
}

impl fmt::Debug for dyn Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transport").field(&self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_accessors() {
        let error = TransportError::Status {
            status: 429,
            retry_after: Some("2".to_owned()),
        };
        assert_eq!(error.status(), Some(429));
        assert_eq!(error.retry_after(), Some("2"));
        assert_eq!(error.to_string(), "collector responded with status 429");

        assert_eq!(TransportError::Opaque.status(), None);
        assert_eq!(TransportError::Opaque.retry_after(), None);
    }
}
