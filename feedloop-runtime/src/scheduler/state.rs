use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::feed::FeedResult;
use crate::observer::SkipReason;

/// Consecutive-failure ceiling. At the ceiling the backoff multiplier is
/// 2^5 = 32x the nominal interval and stops growing.
pub(crate) const BACKOFF_FAILURE_CAP: u32 = 5;

/// Feeds polling faster than this keep quiet while the surface is hidden;
/// slower feeds poll on in the background.
pub(crate) const BACKGROUND_FLOOR_MS: u64 = 300_000;

/// Sentinel for "never attempted" in the monotonic attempt stamp.
const NEVER: u64 = u64::MAX;

/// Type-erased feed action: each call returns a fresh attempt future.
pub(crate) type BoxedAction =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = FeedResult> + Send>> + Send + Sync>;

/// How a feed is driven.
#[derive(Debug, Clone)]
pub(crate) enum Schedule {
    /// Repeating timer with a fixed period.
    Interval(Duration),
    /// Calendar-based fires via the cron sub-scheduler.
    Cron(String),
}

/// Backoff window after `failures` consecutive failures.
pub(crate) fn backoff_window_ms(interval_ms: u64, failures: u32) -> u64 {
    interval_ms.saturating_mul(1u64 << failures.min(BACKOFF_FAILURE_CAP))
}

/// One registered feed: immutable definition plus the coordination state
/// the guard and backoff tracker mutate across attempts.
pub(crate) struct FeedState {
    pub(crate) name: String,
    pub(crate) schedule: Schedule,
    pub(crate) action: BoxedAction,
    /// Execution guard: true only while an attempt is in flight.
    running: AtomicBool,
    consecutive_failures: AtomicU32,
    /// Milliseconds since the scheduler epoch of the latest attempt,
    /// `NEVER` until the first one. Drives backoff gating.
    last_attempt_rel_ms: AtomicU64,
    /// Wall-clock stamp of the latest attempt for snapshots, epoch
    /// milliseconds, 0 until the first attempt.
    last_attempt_unix_ms: AtomicI64,
}

impl FeedState {
    pub(crate) fn new(name: String, schedule: Schedule, action: BoxedAction) -> Self {
        Self {
            name,
            schedule,
            action,
            running: AtomicBool::new(false),
            consecutive_failures: AtomicU32::new(0),
            last_attempt_rel_ms: AtomicU64::new(NEVER),
            last_attempt_unix_ms: AtomicI64::new(0),
        }
    }

    pub(crate) fn interval_ms(&self) -> Option<u64> {
        match &self.schedule {
            Schedule::Interval(period) => Some(period.as_millis() as u64),
            Schedule::Cron(_) => None,
        }
    }

    /// Whether the visibility gate applies: fast interval feeds only.
    /// Cron feeds are calendar-paced and count as slow by construction.
    pub(crate) fn suppressed_when_hidden(&self) -> bool {
        matches!(self.interval_ms(), Some(ms) if ms < BACKGROUND_FLOOR_MS)
    }

    /// Claim the execution guard. Returns a release-on-drop token, or
    /// `None` if an attempt is already in flight.
    pub(crate) fn try_claim(&self) -> Option<RunningToken<'_>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            Some(RunningToken(&self.running))
        } else {
            None
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_attempt(&self, rel_now_ms: u64) {
        self.last_attempt_rel_ms.store(rel_now_ms, Ordering::SeqCst);
        self.last_attempt_unix_ms
            .store(Utc::now().timestamp_millis(), Ordering::SeqCst);
    }

    pub(crate) fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    /// Bump the failure counter, capped. The guard serializes attempts per
    /// feed, so a load/store pair cannot race with another increment.
    pub(crate) fn record_failure(&self) -> u32 {
        let next = (self.consecutive_failures.load(Ordering::SeqCst) + 1).min(BACKOFF_FAILURE_CAP);
        self.consecutive_failures.store(next, Ordering::SeqCst);
        next
    }

    pub(crate) fn failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    /// Whether a scheduled tick should be honored under the current
    /// backoff state. Cron feeds have no nominal interval to scale, so
    /// they are never gated here.
    pub(crate) fn backoff_elapsed(&self, rel_now_ms: u64) -> bool {
        let failures = self.failures();
        if failures == 0 {
            return true;
        }
        let Some(interval_ms) = self.interval_ms() else {
            return true;
        };
        let last = self.last_attempt_rel_ms.load(Ordering::SeqCst);
        if last == NEVER {
            return true;
        }
        rel_now_ms.saturating_sub(last) >= backoff_window_ms(interval_ms, failures)
    }

    pub(crate) fn snapshot(&self) -> FeedSnapshot {
        let unix_ms = self.last_attempt_unix_ms.load(Ordering::SeqCst);
        FeedSnapshot {
            name: self.name.clone(),
            interval_ms: self.interval_ms(),
            cron: match &self.schedule {
                Schedule::Cron(expr) => Some(expr.clone()),
                Schedule::Interval(_) => None,
            },
            running: self.is_running(),
            consecutive_failures: self.failures(),
            last_attempt_at: if unix_ms == 0 {
                None
            } else {
                DateTime::from_timestamp_millis(unix_ms)
            },
        }
    }
}

/// Releases the execution guard when dropped, so the flag resets even if
/// the attempt future panics or is cancelled mid-await.
pub(crate) struct RunningToken<'a>(&'a AtomicBool);

impl Drop for RunningToken<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Settled result of one attempt, as reported by `trigger_all`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FeedOutcome {
    Success,
    Failure(String),
    Skipped(SkipReason),
}

/// Per-feed entry in the `trigger_all` aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedReport {
    pub name: String,
    pub outcome: FeedOutcome,
}

/// Point-in-time view of a feed for dashboards and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct FeedSnapshot {
    pub name: String,
    pub interval_ms: Option<u64>,
    pub cron: Option<String>,
    pub running: bool,
    pub consecutive_failures: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
}
