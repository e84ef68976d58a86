//! reqwest-backed default implementation of the fetch capability

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::Client as ReqwestClient;
use std::time::Instant;
use tracing::debug;

use crate::fetch::error::FetchError;
use crate::fetch::{FetchOptions, FetchResponse, Fetcher};

/// HTTP fetch capability backed by reqwest.
///
/// The per-attempt timeout comes from `FetchOptions`, so one client can be
/// shared across bindings with different budgets.
#[derive(Clone)]
pub struct HttpFetcher {
    client: ReqwestClient,
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = ReqwestClient::builder()
            .build()
            .expect("Failed to create HTTP client");
        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_connect() {
        FetchError::Connection(err.to_string())
    } else {
        FetchError::Other(err.to_string())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchResponse, FetchError> {
        let started = Instant::now();

        debug!("Sending GET request to {}", url);
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &options.user_agent)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(classify)?;

        Ok(FetchResponse {
            body,
            status: status.as_u16(),
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn fetches_a_page_with_the_configured_user_agent() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("GET", "/page")
            .match_header("user-agent", mockito::Matcher::Regex("prospector-crawler/".into()))
            .with_status(200)
            .with_body("<html>content</html>")
            .expect(1)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new();
        let url = format!("{}/page", server.url());
        let response = fetcher.fetch(&url, &FetchOptions::default()).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "<html>content</html>");

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn not_found_is_a_terminal_status_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new();
        let url = format!("{}/missing", server.url());
        let err = fetcher.fetch(&url, &FetchOptions::default()).await.unwrap_err();

        assert!(matches!(err, FetchError::Status(404)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn server_errors_are_retryable() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/flaky")
            .with_status(503)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new();
        let url = format!("{}/flaky", server.url());
        let err = fetcher.fetch(&url, &FetchOptions::default()).await.unwrap_err();

        assert!(matches!(err, FetchError::Status(503)));
        assert!(err.is_retryable());
    }
}
