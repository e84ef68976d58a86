//! Events emitted by a crawl unit as it moves through the pipeline.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::catalog::Tier;

/// Pipeline stage a unit can be in when something terminal happens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Resolve,
    Schedule,
    Fetch,
    Normalize,
    Extract,
    Score,
    Route,
}

/// Lifecycle events of one crawl unit.
///
/// Callers can listen to the event stream for observability; the pipeline
/// also reports every terminal outcome through its return value, so
/// dropping the stream loses nothing but timing detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UnitEvent {
    /// The URL resolved to a binding.
    Resolved { url: String, binding_id: String },

    /// No binding matched the URL; the unit is terminal.
    ResolutionFailed { url: String, cause: String },

    /// The primary binding failed strategy validation and the unit fell
    /// back to the next candidate. Attempted at most once per unit.
    FallbackBinding { from: String, to: String },

    /// The unit is waiting for a fetch permit.
    Scheduled { tier: Tier, attempt: u32 },

    /// No permit arrived within the acquire window; the unit will keep
    /// trying until its deadline.
    Deferred { tier: Tier, waited: Duration },

    /// A fetch attempt is in flight.
    Fetching { attempt: u32 },

    /// A fetch attempt failed. When `retry_in` is set the unit re-enters
    /// scheduling after the delay; otherwise the failure is terminal.
    FetchFailed {
        attempt: u32,
        cause: String,
        retry_in: Option<Duration>,
    },

    /// The fetch succeeded.
    Fetched { status: u16, latency: Duration },

    /// Normalization finished.
    Normalized { words: usize },

    /// One strategy failed; the unit continues with the others.
    StrategyFailed { strategy_id: String, cause: String },

    /// Extraction settled across all strategies.
    Extracted {
        entities: usize,
        triples: usize,
        partial: bool,
    },

    /// The quality score was computed.
    Scored { value: f32 },

    /// The unit was routed; this is the terminal success event.
    Routed { personas: usize },

    /// The unit's deadline elapsed; the unit is terminal and no partial
    /// result is emitted.
    TimedOut { stage: Stage },
}
