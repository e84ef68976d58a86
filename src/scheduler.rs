//! # Rate-Limited Scheduler Module
//!
//! This module issues fetch permits per source tier according to configured
//! request budgets. It is independent of strategy and entity logic: the only
//! thing it knows about a crawl unit is which tier wants to fetch.
//!
//! ## Key Components
//!
//! - `Scheduler`: per-tier token buckets plus a global in-flight cap
//! - `TierConfig`: requests-per-minute budget for one tier
//! - `FetchPermit`: RAII guard returned by a successful acquire
//!
//! ## Features
//!
//! - Independent buckets per tier, so a burst on a low-priority tier cannot
//!   starve a high-priority tier
//! - Cooperative blocking with an acquire timeout; exhaustion is reported as
//!   a deferral, not a failure
//! - Buckets are owned by the scheduler instance, never process-wide, so
//!   pipelines in tests never share token state

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument};

use crate::catalog::Tier;
use crate::error::Error as CrateError;

/// Error type for scheduling operations
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The tier has no configured token bucket
    #[error("No token bucket configured for {0}")]
    UnknownTier(Tier),

    /// No permit became available within the acquire timeout. Deferrals are
    /// retried transparently by the pipeline up to the unit's deadline.
    #[error("Rate limited on {tier}: no permit within {waited:?}")]
    Deferred { tier: Tier, waited: Duration },

    /// The scheduler was shut down while waiting
    #[error("Scheduler closed")]
    Closed,
}

impl From<ScheduleError> for CrateError {
    fn from(err: ScheduleError) -> Self {
        CrateError::Schedule(err.to_string())
    }
}

/// Request budget for one tier
#[derive(Debug, Clone, Copy)]
pub struct TierConfig {
    pub tier: Tier,
    pub requests_per_min: u32,
}

/// Scheduler-wide limits
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Maximum fetches in flight across all tiers
    pub max_in_flight: usize,

    /// How long one acquire may wait before being reported as deferred
    pub acquire_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 32,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Permit for one in-flight fetch. Dropping the permit releases the
/// in-flight slot; consumed tier tokens refill on their own schedule.
#[derive(Debug)]
pub struct FetchPermit {
    _permit: OwnedSemaphorePermit,
}

/// Issues fetch permits per tier from independent token buckets, bounded by
/// a global in-flight cap.
pub struct Scheduler {
    buckets: HashMap<Tier, Arc<DefaultDirectRateLimiter>>,
    in_flight: Arc<Semaphore>,
    acquire_timeout: Duration,
}

impl Scheduler {
    /// Build a scheduler from per-tier budgets. A zero requests-per-minute
    /// budget is clamped to one request per minute.
    pub fn new(tiers: Vec<TierConfig>, config: SchedulerConfig) -> Self {
        let buckets = tiers
            .into_iter()
            .map(|t| {
                let per_min = NonZeroU32::new(t.requests_per_min.max(1))
                    .expect("clamped rate is non-zero");
                let limiter = RateLimiter::direct(Quota::per_minute(per_min));
                (t.tier, Arc::new(limiter))
            })
            .collect();

        Self {
            buckets,
            in_flight: Arc::new(Semaphore::new(config.max_in_flight)),
            acquire_timeout: config.acquire_timeout,
        }
    }

    /// Acquire a fetch permit for `tier`, waiting up to the configured
    /// acquire timeout.
    pub async fn acquire(&self, tier: Tier) -> Result<FetchPermit, ScheduleError> {
        self.acquire_within(tier, self.acquire_timeout).await
    }

    /// Acquire a fetch permit for `tier`, waiting at most `timeout`.
    ///
    /// The in-flight slot is claimed before the tier token so a unit that
    /// times out waiting for a token never holds a token it will not use.
    #[instrument(skip(self))]
    pub async fn acquire_within(
        &self,
        tier: Tier,
        timeout: Duration,
    ) -> Result<FetchPermit, ScheduleError> {
        let bucket = self
            .buckets
            .get(&tier)
            .ok_or(ScheduleError::UnknownTier(tier))?
            .clone();

        let in_flight = self.in_flight.clone();
        let acquire = async move {
            let permit = in_flight
                .acquire_owned()
                .await
                .map_err(|_| ScheduleError::Closed)?;
            bucket.until_ready().await;
            Ok(FetchPermit { _permit: permit })
        };

        let started = tokio::time::Instant::now();
        match tokio::time::timeout(timeout, acquire).await {
            Ok(result) => {
                if result.is_ok() {
                    debug!(%tier, waited = ?started.elapsed(), "fetch permit granted");
                }
                result
            }
            Err(_) => Err(ScheduleError::Deferred {
                tier,
                waited: started.elapsed(),
            }),
        }
    }

    /// Number of currently free in-flight slots
    pub fn available_slots(&self) -> usize {
        self.in_flight.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler(rpm: u32, max_in_flight: usize) -> Scheduler {
        Scheduler::new(
            vec![TierConfig {
                tier: Tier(1),
                requests_per_min: rpm,
            }],
            SchedulerConfig {
                max_in_flight,
                acquire_timeout: Duration::from_millis(50),
            },
        )
    }

    #[tokio::test]
    async fn unknown_tier_is_an_error() {
        let s = scheduler(60, 4);
        let err = s.acquire(Tier(9)).await.unwrap_err();
        assert!(matches!(err, ScheduleError::UnknownTier(Tier(9))));
    }

    #[tokio::test]
    async fn exhausted_budget_defers_instead_of_failing() {
        // One request per minute: the first permit is granted from the
        // bucket's burst capacity, the second must wait ~60s and therefore
        // defers within the 50ms acquire timeout.
        let s = scheduler(1, 4);

        s.acquire(Tier(1)).await.unwrap();
        let err = s.acquire(Tier(1)).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Deferred { tier: Tier(1), .. }));
    }

    #[tokio::test]
    async fn tiers_do_not_starve_each_other() {
        let s = Scheduler::new(
            vec![
                TierConfig {
                    tier: Tier(1),
                    requests_per_min: 1,
                },
                TierConfig {
                    tier: Tier(2),
                    requests_per_min: 60,
                },
            ],
            SchedulerConfig {
                max_in_flight: 4,
                acquire_timeout: Duration::from_millis(50),
            },
        );

        // Exhaust tier 1.
        s.acquire(Tier(1)).await.unwrap();
        assert!(s.acquire(Tier(1)).await.is_err());

        // Tier 2 still grants immediately.
        s.acquire(Tier(2)).await.unwrap();
    }

    #[tokio::test]
    async fn in_flight_cap_bounds_concurrency() {
        let s = scheduler(60, 1);

        let held = s.acquire(Tier(1)).await.unwrap();
        assert_eq!(s.available_slots(), 0);

        let err = s.acquire(Tier(1)).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Deferred { .. }));

        drop(held);
        s.acquire(Tier(1)).await.unwrap();
    }
}
