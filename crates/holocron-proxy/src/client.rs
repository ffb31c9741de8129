//! Films API client

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::ProxyError;
use crate::types::FilmPage;

/// Source of film pages
///
/// Implemented by [`SwapiClient`]; the sync engine depends only on this trait.
#[async_trait]
pub trait FilmSource: Send + Sync {
    /// Fetch the page at `url`
    async fn fetch_page(&self, url: &str) -> Result<FilmPage, ProxyError>;
}

/// Films client configuration
#[derive(Clone, Debug)]
pub struct SwapiClientConfig {
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Skip TLS certificate verification
    pub skip_tls_verify: bool,
}

impl Default for SwapiClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            skip_tls_verify: false,
        }
    }
}

/// HTTP client for the upstream films API
pub struct SwapiClient {
    client: Client,
}

impl SwapiClient {
    /// Create a new films client
    pub fn new(config: SwapiClientConfig) -> Result<Self, ProxyError> {
        let mut builder = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("holocron/", env!("CARGO_PKG_VERSION")));

        if config.skip_tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build()?;

        info!(
            "Created films client (timeout: {:?})",
            config.request_timeout
        );

        Ok(Self { client })
    }
}

#[async_trait]
impl FilmSource for SwapiClient {
    async fn fetch_page(&self, url: &str) -> Result<FilmPage, ProxyError> {
        debug!("Fetching films page: {}", url);

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| timeout_or_http(url, e))?;
        let status = response.status();

        if !status.is_success() {
            return Err(ProxyError::UpstreamError {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.text().await.map_err(|e| timeout_or_http(url, e))?;
        if status == StatusCode::NO_CONTENT || body.trim().is_empty() {
            return Err(ProxyError::InvalidResponse(format!("Empty body from {}", url)));
        }

        serde_json::from_str(&body)
            .map_err(|e| ProxyError::InvalidResponse(format!("{}: {}", url, e)))
    }
}

fn timeout_or_http(url: &str, err: reqwest::Error) -> ProxyError {
    if err.is_timeout() {
        ProxyError::Timeout(url.to_string())
    } else {
        ProxyError::Http(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(timeout: Duration) -> SwapiClient {
        SwapiClient::new(SwapiClientConfig {
            request_timeout: timeout,
            skip_tls_verify: false,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/films/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{
                    "episode_number": 1,
                    "title": "The Phantom Menace",
                    "director": "George Lucas",
                    "release_date": "1999-05-19",
                    "description": "Turmoil has engulfed the Galactic Republic."
                }],
                "next": null
            })))
            .mount(&server)
            .await;

        let page = client(Duration::from_secs(5))
            .fetch_page(&format!("{}/api/films/", server.uri()))
            .await
            .unwrap();

        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].episode_number, 1);
        assert_eq!(page.next, None);
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let err = client(Duration::from_secs(5))
            .fetch_page(&format!("{}/api/films/", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::UpstreamError { status: 503, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&server)
            .await;

        let err = client(Duration::from_secs(5))
            .fetch_page(&format!("{}/api/films/", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::InvalidResponse(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_slow_upstream_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"results": [], "next": null}))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = client(Duration::from_millis(100))
            .fetch_page(&format!("{}/api/films/", server.uri()))
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::Timeout(_)));
        assert!(err.is_retryable());
    }
}
