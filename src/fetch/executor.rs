//! Timeout, classification, and backoff around the injected fetch capability

use rand::{thread_rng, Rng};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use url::Url;

use crate::catalog::RetryPolicy;
use crate::fetch::error::FetchError;
use crate::fetch::{FetchOptions, FetchResponse, Fetcher};

/// Ceiling on any single backoff sleep
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Wraps the injected `Fetcher` with the executor-side responsibilities:
/// URL validation, the per-attempt timeout, and backoff computation. The
/// pipeline sequences attempts so each retry passes back through the
/// scheduler.
#[derive(Clone)]
pub struct FetchExecutor {
    fetcher: Arc<dyn Fetcher>,
}

impl FetchExecutor {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Run one fetch attempt.
    ///
    /// A malformed URL is rejected before any I/O and is terminal. An attempt
    /// that outlives `options.timeout` is classified as `FetchError::Timeout`,
    /// which is retryable.
    #[instrument(skip(self, options))]
    pub async fn attempt(
        &self,
        url: &str,
        options: &FetchOptions,
    ) -> Result<FetchResponse, FetchError> {
        Url::parse(url)?;

        match tokio::time::timeout(options.timeout, self.fetcher.fetch(url, options)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        }
    }

    /// Delay before retrying after `attempt` failed attempts (1-based):
    /// exponential in the policy's base with ±20% jitter, capped.
    pub fn backoff_delay(retry: &RetryPolicy, attempt: u32) -> Duration {
        let exp_factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        let mut delay = retry.backoff_base.saturating_mul(exp_factor);

        if delay > Duration::from_millis(1) {
            let jitter_factor = thread_rng().gen_range(0.8..1.2);
            delay = delay.mul_f64(jitter_factor);
        }

        delay.min(MAX_BACKOFF)
    }
}
