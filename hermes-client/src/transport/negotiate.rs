use std::sync::Arc;

use hermes_config::TransportCapabilities;

use crate::transport::{FetchTransport, HttpClient, LegacyTransport, Transport, XhrTransport};

/// An error returned by [`negotiate`].
#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    /// The host supports none of the delivery mechanisms.
    #[error("no delivery mechanism available")]
    NoMechanism,
}

/// Selects the best delivery mechanism the host supports.
///
/// Mechanisms are tried in order: fetch, XHR with CORS, then legacy cross-domain requests.
pub fn negotiate(
    capabilities: &TransportCapabilities,
    client: &HttpClient,
) -> Result<Arc<dyn Transport>, NegotiationError> {
    let transport: Arc<dyn Transport> = if capabilities.fetch {
        Arc::new(FetchTransport::new(client.clone()))
    } else if capabilities.xhr && capabilities.cors {
        Arc::new(XhrTransport::new(client.clone()))
    } else if capabilities.cross_domain_request {
        Arc::new(LegacyTransport::new(
            client.clone(),
            capabilities.page_scheme.clone(),
        ))
    } else {
        return Err(NegotiationError::NoMechanism);
    };

    hermes_log::debug!(transport = transport.name(), "selected transport");
    Ok(transport)
}

#[cfg(test)]
mod tests {
    use hermes_config::Http;

    use super::*;

    #[test]
    fn test_no_mechanism_error() {
        let client = HttpClient::new(&Http::default()).unwrap();
        let capabilities = TransportCapabilities {
            fetch: false,
            xhr: false,
            cors: false,
            cross_domain_request: false,
            page_scheme: "https".to_owned(),
        };

        let error = negotiate(&capabilities, &client).unwrap_err();
        assert!(matches!(error, NegotiationError::NoMechanism));
        assert_eq!(error.to_string(), "no delivery mechanism available");
    }

    fn selected(capabilities: TransportCapabilities) -> Option<&'static str> {
        let client = HttpClient::new(&Http::default()).unwrap();
        negotiate(&capabilities, &client)
            .ok()
            .map(|transport| transport.name())
    }

    #[test]
    fn test_fallback_order() {
        let all = TransportCapabilities {
            cross_domain_request: true,
            ..Default::default()
        };
        assert_eq!(selected(all.clone()), Some("fetch"));

        let no_fetch = TransportCapabilities {
            fetch: false,
            ..all.clone()
        };
        assert_eq!(selected(no_fetch.clone()), Some("xhr"));

        let no_cors = TransportCapabilities {
            cors: false,
            ..no_fetch.clone()
        };
        assert_eq!(selected(no_cors.clone()), Some("legacy"));

        let none = TransportCapabilities {
            cross_domain_request: false,
            ..no_cors
        };
        assert_eq!(selected(none), None);
    }

    #[test]
    fn test_default_is_fetch() {
        assert_eq!(selected(TransportCapabilities::default()), Some("fetch"));
    }
}
