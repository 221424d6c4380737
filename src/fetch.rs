//! Listing-page retrieval.
//!
//! The aggregator only sees the [`FetchMarkup`] trait, so the network can
//! be replaced by canned markup in tests. [`HttpFetcher`] is the real
//! implementation: one GET per source, browser user agent, fixed timeout,
//! no retries.

use crate::config::HttpConfig;
use crate::error::SourceError;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Something that can turn a listing URL into markup text.
pub trait FetchMarkup {
    /// Fetch the body of `url` as text.
    async fn fetch(&self, url: &str) -> Result<String, SourceError>;
}

/// `reqwest`-backed [`FetchMarkup`] with a fixed per-request timeout.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Build a fetcher sending `user_agent` and giving up after `timeout`.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("hr,de;q=0.8,en;q=0.6"),
        );

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Client(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    pub fn from_config(http: &HttpConfig) -> Result<Self, SourceError> {
        Self::new(&http.user_agent, Duration::from_secs(http.timeout_secs))
    }
}

impl fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl FetchMarkup for HttpFetcher {
    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, url: &str) -> Result<String, SourceError> {
        let t0 = Instant::now();
        let result: Result<String, SourceError> = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| SourceError::from_reqwest(url, e))?;
            // Decodes using the charset announced by the server.
            response
                .text()
                .await
                .map_err(|e| SourceError::from_reqwest(url, e))
        }
        .await;
        let elapsed_ms = t0.elapsed().as_millis() as u64;

        match &result {
            Ok(body) => info!(elapsed_ms, bytes = body.len(), "Fetched listing"),
            Err(e) => warn!(elapsed_ms, error = %e, "Listing fetch failed"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_USER_AGENT;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_fetch_sends_user_agent_and_returns_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/gradovi/8/umag")
                    .header("user-agent", DEFAULT_USER_AGENT);
                then.status(200)
                    .header("content-type", "text/html; charset=utf-8")
                    .body("<article class=\"news-item\">Žminj</article>");
            })
            .await;

        let fetcher = HttpFetcher::from_config(&HttpConfig::default()).unwrap();
        let body = fetcher.fetch(&server.url("/gradovi/8/umag")).await.unwrap();

        mock.assert_async().await;
        assert!(body.contains("Žminj"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing");
                then.status(404).body("not here");
            })
            .await;

        let fetcher = HttpFetcher::new(DEFAULT_USER_AGENT, Duration::from_secs(5)).unwrap();
        let err = fetcher.fetch(&server.url("/missing")).await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_slow_source_times_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/slow");
                then.status(200).delay(Duration::from_secs(3)).body("late");
            })
            .await;

        let fetcher = HttpFetcher::new(DEFAULT_USER_AGENT, Duration::from_millis(200)).unwrap();
        let err = fetcher.fetch(&server.url("/slow")).await.unwrap_err();
        assert!(matches!(err, SourceError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let fetcher = HttpFetcher::new(DEFAULT_USER_AGENT, Duration::from_secs(2)).unwrap();
        let err = fetcher.fetch("http://127.0.0.1:9/news").await.unwrap_err();
        assert!(matches!(err, SourceError::Transport { .. }));
    }
}
