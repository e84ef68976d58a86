//! # Fetch Module
//!
//! This module performs the network-facing half of a crawl unit. Fetching
//! itself is an injected capability (`Fetcher`); the module's own
//! responsibilities are the per-request timeout, retryable/terminal failure
//! classification, backoff computation, and the fetch metadata attached to
//! every crawl result whether or not the fetch succeeded.
//!
//! ## Key Components
//!
//! - `Fetcher`: the abstract fetch capability (HTTP, local file, queued job)
//! - `FetchExecutor`: wraps a `Fetcher` with timeout and classification
//! - `HttpFetcher`: reqwest-backed default capability
//! - `MockFetcher`: scriptable capability for tests
//!
//! ## Features
//!
//! - Exponential backoff with jitter, bounded attempt count
//! - Retryable (timeout, 5xx, 429, connection) vs terminal (other 4xx,
//!   malformed URL) failure classification
//! - Fetch metadata (latency, status, attempts) on success and failure

mod error;
mod executor;
mod http;
pub mod mock;

pub use error::FetchError;
pub use executor::FetchExecutor;
pub use http::HttpFetcher;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-request options applied around the injected capability
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Budget for a single fetch attempt
    pub timeout: Duration,

    /// User agent sent with requests
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: format!("prospector-crawler/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Raw content plus transport details from one successful fetch
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Response body as text
    pub body: String,

    /// Final HTTP status code
    pub status: u16,

    /// Time the capability spent on the request
    pub elapsed: Duration,
}

/// Transport details carried on the crawl result regardless of outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchMetadata {
    /// Final status code, when a response was received at all
    pub status: Option<u16>,

    /// Total time spent fetching, across attempts
    pub latency: Duration,

    /// Number of attempts made (1 when the first try succeeded)
    pub attempts: u32,

    /// Human-readable error for failed fetches
    pub error: Option<String>,
}

/// The abstract fetch capability injected into the pipeline.
///
/// Implementations perform the actual I/O; the executor layers timeout,
/// classification, and metadata on top. Substituting transport (HTTP, local
/// file, queued job) is an external concern.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchResponse, FetchError>;
}
