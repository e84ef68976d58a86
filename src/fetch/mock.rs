//! # Mock Fetch Capability for Testing
//!
//! Provides a `MockFetcher` that implements the `Fetcher` trait for use in
//! tests. Responses and errors are scripted up front to simulate transport
//! behavior without network access.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::fetch::error::FetchError;
use crate::fetch::{FetchOptions, FetchResponse, Fetcher};

/// A scriptable fetch capability for tests.
///
/// Scripted outcomes are consumed front to back; once the script is empty,
/// every fetch returns a small default success response.
#[derive(Clone, Default)]
pub struct MockFetcher {
    script: Arc<Mutex<VecDeque<Result<FetchResponse, FetchError>>>>,
    calls: Arc<AtomicU32>,
    delay: Option<Duration>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every fetch sleep before answering, for timeout tests
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful response
    pub async fn push_response(&self, body: &str, status: u16) {
        self.script.lock().await.push_back(Ok(FetchResponse {
            body: body.to_string(),
            status,
            elapsed: Duration::from_millis(5),
        }));
    }

    /// Queue a failure
    pub async fn push_error(&self, error: FetchError) {
        self.script.lock().await.push_back(Err(error));
    }

    /// Number of fetches performed so far
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, _url: &str, _options: &FetchOptions) -> Result<FetchResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.script.lock().await.pop_front();
        match scripted {
            Some(outcome) => outcome,
            None => Ok(FetchResponse {
                body: "ok".to_string(),
                status: 200,
                elapsed: Duration::from_millis(1),
            }),
        }
    }
}
