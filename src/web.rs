//! # Outbound HTTP access.
//!
//! A thin wrapper around `reqwest` that gives every jobvisor process the
//! same timeout discipline: a bounded dial and a bounded whole-request
//! budget, so a stuck remote endpoint cannot pin a run past its own
//! deadlines.
//!
//! Status handling stays with the caller: [`HttpClient::get`] returns the
//! response for any status, and [`HttpClient::get_text`] is the shortcut
//! that treats non-2xx as an error.

use std::time::Duration;

use thiserror::Error;

/// Default time allowed for the TCP/TLS dial.
pub const DEFAULT_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default budget for the whole request, body included.
pub const DEFAULT_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(70);

/// Errors raised by [`HttpClient`].
#[derive(Debug, Error)]
pub enum HttpError {
    /// The underlying client could not be constructed.
    #[error("http client build failed: {0}")]
    Build(reqwest::Error),

    /// The request failed (DNS, connect, timeout, transport).
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote answered with a non-success status.
    #[error("http status {status} from {url}")]
    Status { status: u16, url: String },
}

/// Timeouts applied to every request the client sends.
#[derive(Debug, Clone, Copy)]
pub struct HttpSettings {
    /// Maximum time for the dial to complete.
    pub connect_timeout: Duration,
    /// Maximum time for the entire request, never less than the dial budget.
    pub request_timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_HTTP_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_HTTP_REQUEST_TIMEOUT,
        }
    }
}

/// Shared HTTP client with fixed timeout discipline.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Builds a client with the given timeouts.
    pub fn new(settings: HttpSettings) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(HttpError::Build)?;
        Ok(Self { client })
    }

    /// Builds a client with [`HttpSettings::default`].
    pub fn with_defaults() -> Result<Self, HttpError> {
        Self::new(HttpSettings::default())
    }

    /// Sends a GET and returns the response regardless of status.
    pub async fn get(&self, url: &str) -> Result<reqwest::Response, HttpError> {
        let response = self.client.get(url).send().await?;
        tracing::debug!(url, status = response.status().as_u16(), "http get");
        Ok(response)
    }

    /// Sends a GET and returns the body text, failing on non-2xx statuses.
    pub async fn get_text(&self, url: &str) -> Result<String, HttpError> {
        let response = self.get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = HttpSettings::default();
        assert_eq!(settings.connect_timeout, Duration::from_secs(10));
        assert_eq!(settings.request_timeout, Duration::from_secs(70));
    }

    #[test]
    fn test_client_builds_with_defaults() {
        assert!(HttpClient::with_defaults().is_ok());
    }

    #[tokio::test]
    async fn test_get_rejects_malformed_url_without_network() {
        let client = HttpClient::with_defaults().unwrap();
        let err = client.get("://bad").await.unwrap_err();
        assert!(matches!(err, HttpError::Request(_)));
    }
}
