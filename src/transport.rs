//! HTTP transport capability
//!
//! Providers never talk to `reqwest` directly. They go through [`Transport`],
//! which returns the status code and body text and leaves the interpretation
//! of both to the caller. There are no automatic retries.

use std::time::Duration;
use thiserror::Error;

/// Default timeout applied by [`HttpTransport::new`]
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while talking to a provider over HTTP
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request could not be sent or its body could not be read
    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The provider answered with something other than 200 OK
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
}

/// Status code and raw body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw response body
    pub body: String,
}

/// Synchronous GET requests
pub trait Transport: Send + Sync {
    /// Performs a GET request against `url`
    ///
    /// Non-200 responses are returned as-is; only failures to complete the
    /// exchange are errors.
    fn fetch(&self, url: &str) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a blocking `reqwest` client
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Creates a transport with [`DEFAULT_REQUEST_TIMEOUT`]
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Creates a transport whose requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("imdb_pulse/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Request {
                url: String::new(),
                reason: e.to_string(),
            })?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| TransportError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();

        let body = response.text().map_err(|e| TransportError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(TransportResponse { status, body })
    }
}
