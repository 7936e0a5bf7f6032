use async_trait::async_trait;
use hermes_config::Http;
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;

use crate::transport::{Transport, TransportError, TransportRequest};

/// The HTTP client shared by all built-in transports.
#[derive(Clone, Debug)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    /// Creates a client with the configured timeouts.
    pub fn new(http: &Http) -> Result<Self, reqwest::Error> {
        let inner = reqwest::ClientBuilder::new()
            .connect_timeout(http.connection_timeout())
            .timeout(http.timeout())
            .build()?;

        Ok(Self { inner })
    }

    /// Returns the underlying `reqwest` client.
    pub fn inner(&self) -> &reqwest::Client {
        &self.inner
    }

    /// Posts the serialized event with all request headers.
    async fn post(&self, request: &TransportRequest) -> Result<reqwest::Response, TransportError> {
        let body = serde_json::to_vec(&*request.event)?;

        let mut builder = self.inner.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        Ok(builder.body(body).send().await?)
    }
}

fn status_error(response: &reqwest::Response) -> TransportError {
    TransportError::Status {
        status: response.status().as_u16(),
        retry_after: response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned),
    }
}

/// Sends payloads like the `fetch` API.
///
/// Any successful status is accepted. Error responses expose their status and `Retry-After`.
#[derive(Clone, Debug)]
pub struct FetchTransport {
    client: HttpClient,
}

impl FetchTransport {
    /// Creates a transport on the shared client.
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for FetchTransport {
    async fn send(&self, request: TransportRequest) -> Result<(), TransportError> {
        let response = self.client.post(&request).await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(&response))
        }
    }

    fn name(&self) -> &'static str {
        "fetch"
    }
}

/// Sends payloads like a cross-origin `XMLHttpRequest`.
///
/// Only status 200 is accepted.
#[derive(Clone, Debug)]
pub struct XhrTransport {
    client: HttpClient,
}

impl XhrTransport {
    /// Creates a transport on the shared client.
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for XhrTransport {
    async fn send(&self, request: TransportRequest) -> Result<(), TransportError> {
        let response = self.client.post(&request).await?;

        if response.status() == StatusCode::OK {
            Ok(())
        } else {
            Err(status_error(&response))
        }
    }

    fn name(&self) -> &'static str {
        "xhr"
    }
}

/// Sends payloads like the legacy cross-domain request API.
///
/// The endpoint is requested with the scheme of the hosting page, custom headers are not sent,
/// and failures carry no status.
#[derive(Clone, Debug)]
pub struct LegacyTransport {
    client: HttpClient,
    page_scheme: String,
}

impl LegacyTransport {
    /// Creates a transport on the shared client for pages served with `page_scheme`.
    pub fn new(client: HttpClient, page_scheme: impl Into<String>) -> Self {
        Self {
            client,
            page_scheme: page_scheme.into(),
        }
    }

    /// Rewrites the endpoint to the scheme of the hosting page.
    fn resolve_url(&self, url: &str) -> String {
        let relative = url
            .strip_prefix("https:")
            .or_else(|| url.strip_prefix("http:"))
            .unwrap_or(url);

        match relative.strip_prefix("//") {
            Some(_) => format!("{}:{relative}", self.page_scheme),
            None => relative.to_owned(),
        }
    }
}

#[async_trait]
impl Transport for LegacyTransport {
    async fn send(&self, request: TransportRequest) -> Result<(), TransportError> {
        let body = serde_json::to_vec(&*request.event)?;
        let url = self.resolve_url(&request.url);

        let response = match self.client.inner().post(url).body(body).send().await {
            Ok(response) => response,
            Err(error) => {
                hermes_log::trace!(error = %hermes_log::LogError(&error), "legacy request failed");
                return Err(TransportError::Opaque);
            }
        };

        if response.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::Opaque)
        }
    }

    fn name(&self) -> &'static str {
        "legacy"
    }
}
