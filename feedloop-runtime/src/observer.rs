use std::time::Duration;

use serde::Serialize;

/// Why an attempt was skipped without invoking the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// A previous attempt of the same feed is still in flight.
    InFlight,
    /// The consuming surface is hidden and the feed polls too fast to
    /// keep running in the background.
    Hidden,
    /// The feed is failing and its backoff window has not elapsed yet.
    Backoff,
}

/// Sink for per-attempt outcomes.
///
/// Injected into the scheduler so failures end up somewhere queryable (a
/// metrics pipeline, an event bus) instead of only in text logs. All
/// methods default to no-ops; implement the ones you care about.
pub trait FeedObserver: Send + Sync {
    fn feed_succeeded(&self, _feed: &str, _elapsed: Duration) {}

    fn feed_failed(&self, _feed: &str, _consecutive_failures: u32, _error: &(dyn std::error::Error + 'static)) {}

    fn feed_skipped(&self, _feed: &str, _reason: SkipReason) {}
}

/// Default observer: structured log events via `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl FeedObserver for TracingObserver {
    fn feed_succeeded(&self, feed: &str, elapsed: Duration) {
        tracing::debug!(feed, elapsed_ms = elapsed.as_millis() as u64, "feed refreshed");
    }

    fn feed_failed(&self, feed: &str, consecutive_failures: u32, error: &(dyn std::error::Error + 'static)) {
        tracing::warn!(feed, consecutive_failures, %error, "feed attempt failed");
    }

    fn feed_skipped(&self, feed: &str, reason: SkipReason) {
        tracing::trace!(feed, ?reason, "feed attempt skipped");
    }
}
