use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_cron_scheduler::{Job, JobScheduler};

use super::state::{FeedOutcome, FeedReport, FeedSnapshot, FeedState, Schedule};
use crate::error::SchedulerError;
use crate::observer::{FeedObserver, SkipReason};

/// Polling engine for a set of registered feeds.
///
/// Owns all coordination state (execution guards, backoff counters, the
/// visibility gate); feed actions stay opaque. Lifecycle:
/// `build -> start_all -> [pause_all <-> resume_all]* -> shutdown`.
pub struct Scheduler {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    /// Monotonic origin for backoff bookkeeping; all attempt stamps are
    /// relative to it so paused-clock tests observe exact windows.
    epoch: tokio::time::Instant,
    feeds: Vec<Arc<FeedState>>,
    visible: AtomicBool,
    active: AtomicBool,
    observer: Arc<dyn FeedObserver>,
    attempt_timeout: Option<Duration>,
    tickers: Mutex<Vec<JoinHandle<()>>>,
    cron: tokio::sync::Mutex<Option<JobScheduler>>,
}

impl Inner {
    fn rel_now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Scheduled tick: honor the backoff window first, then run the
    /// regular attempt procedure.
    async fn tick_attempt(&self, feed: &FeedState) -> FeedOutcome {
        if !feed.backoff_elapsed(self.rel_now_ms()) {
            self.observer.feed_skipped(&feed.name, SkipReason::Backoff);
            return FeedOutcome::Skipped(SkipReason::Backoff);
        }
        self.attempt(feed).await
    }

    /// One execution attempt: guard check, visibility check, claim, run,
    /// record. The sole suspension point is the awaited action.
    async fn attempt(&self, feed: &FeedState) -> FeedOutcome {
        if feed.is_running() {
            self.observer.feed_skipped(&feed.name, SkipReason::InFlight);
            return FeedOutcome::Skipped(SkipReason::InFlight);
        }
        if !self.visible.load(Ordering::SeqCst) && feed.suppressed_when_hidden() {
            self.observer.feed_skipped(&feed.name, SkipReason::Hidden);
            return FeedOutcome::Skipped(SkipReason::Hidden);
        }
        // Claim the guard; a concurrent attempt that won the race turns
        // this tick into a silent skip.
        let Some(_token) = feed.try_claim() else {
            self.observer.feed_skipped(&feed.name, SkipReason::InFlight);
            return FeedOutcome::Skipped(SkipReason::InFlight);
        };

        feed.mark_attempt(self.rel_now_ms());
        let started = tokio::time::Instant::now();

        let result = match self.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, (feed.action)()).await {
                Ok(result) => result,
                Err(_) => Err(format!("attempt exceeded {limit:?}").into()),
            },
            None => (feed.action)().await,
        };

        // `_token` drops below, releasing the guard on every path out of
        // the attempt, including a panicking action future.
        match result {
            Ok(()) => {
                feed.record_success();
                self.observer.feed_succeeded(&feed.name, started.elapsed());
                FeedOutcome::Success
            }
            Err(error) => {
                let failures = feed.record_failure();
                self.observer.feed_failed(&feed.name, failures, error.as_ref());
                FeedOutcome::Failure(error.to_string())
            }
        }
    }
}

fn spawn_ticker(inner: Arc<Inner>, feed: Arc<FeedState>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The immediate first tick is already covered by the catch-up
        // attempt fired at start/resume.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let inner = inner.clone();
            let feed = feed.clone();
            tokio::spawn(async move {
                inner.tick_attempt(&feed).await;
            });
        }
    })
}

impl Scheduler {
    pub(crate) fn new(
        feeds: Vec<Arc<FeedState>>,
        observer: Arc<dyn FeedObserver>,
        attempt_timeout: Option<Duration>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                epoch: tokio::time::Instant::now(),
                feeds,
                visible: AtomicBool::new(true),
                active: AtomicBool::new(false),
                observer,
                attempt_timeout,
                tickers: Mutex::new(Vec::new()),
                cron: tokio::sync::Mutex::new(None),
            }),
        }
    }

    /// Begin continuous polling: one immediate attempt per feed, then a
    /// repeating timer at each feed's nominal period. A second call while
    /// running is a no-op.
    pub async fn start_all(&self) -> Result<(), SchedulerError> {
        self.launch().await
    }

    /// Stop continuous polling: future ticks are cancelled outright, and
    /// the gate goes hidden. An attempt already in flight runs to
    /// completion and still releases its guard. Idempotent.
    pub async fn pause_all(&self) {
        let inner = &self.inner;
        inner.visible.store(false, Ordering::SeqCst);
        if !inner.active.swap(false, Ordering::SeqCst) {
            return;
        }
        tracing::info!("pausing all feeds");
        for handle in inner.tickers.lock().unwrap_or_else(|e| e.into_inner()).drain(..) {
            handle.abort();
        }
        if let Some(mut cron) = inner.cron.lock().await.take() {
            if let Err(error) = cron.shutdown().await {
                tracing::warn!(%error, "cron sub-scheduler shutdown failed");
            }
        }
    }

    /// Restart continuous polling with an immediate catch-up attempt per
    /// feed, independent of how much of its period remains. Idempotent.
    pub async fn resume_all(&self) -> Result<(), SchedulerError> {
        self.launch().await
    }

    async fn launch(&self) -> Result<(), SchedulerError> {
        let inner = &self.inner;
        inner.visible.store(true, Ordering::SeqCst);
        if inner.active.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        tracing::info!(feeds = inner.feeds.len(), "starting feed polling");

        // Cron registration is the only fallible part; do it before any
        // timer exists so a bad expression leaves the scheduler inert.
        let cron_feeds: Vec<_> = inner
            .feeds
            .iter()
            .filter(|feed| matches!(feed.schedule, Schedule::Cron(_)))
            .cloned()
            .collect();
        if !cron_feeds.is_empty() {
            match self.build_cron(&cron_feeds).await {
                Ok(cron) => *inner.cron.lock().await = Some(cron),
                Err(error) => {
                    inner.active.store(false, Ordering::SeqCst);
                    return Err(error);
                }
            }
        }

        let mut tickers = inner.tickers.lock().unwrap_or_else(|e| e.into_inner());
        for feed in &inner.feeds {
            // Catch-up attempt, not backoff-gated.
            let attempt_inner = inner.clone();
            let attempt_feed = feed.clone();
            tokio::spawn(async move {
                attempt_inner.attempt(&attempt_feed).await;
            });

            if let Schedule::Interval(period) = feed.schedule {
                tickers.push(spawn_ticker(inner.clone(), feed.clone(), period));
            }
        }
        Ok(())
    }

    async fn build_cron(&self, cron_feeds: &[Arc<FeedState>]) -> Result<JobScheduler, SchedulerError> {
        let mut cron = JobScheduler::new().await?;
        for feed in cron_feeds {
            let Schedule::Cron(expr) = &feed.schedule else {
                continue;
            };
            let inner = self.inner.clone();
            let feed = feed.clone();
            let job = Job::new_async(expr.as_str(), move |_uuid, _lock| {
                let inner = inner.clone();
                let feed = feed.clone();
                Box::pin(async move {
                    inner.tick_attempt(&feed).await;
                })
            })?;
            cron.add(job).await?;
        }
        cron.start().await?;
        Ok(cron)
    }

    /// Attempt every feed exactly once, out-of-band from its timer.
    /// Attempts are issued in registration order and the aggregate settles
    /// after every one has; individual failures never fail the whole.
    pub async fn trigger_all(&self) -> Vec<FeedReport> {
        let mut attempts = Vec::with_capacity(self.inner.feeds.len());
        for feed in &self.inner.feeds {
            let inner = self.inner.clone();
            let feed = feed.clone();
            let name = feed.name.clone();
            attempts.push((name, tokio::spawn(async move { inner.attempt(&feed).await })));
        }

        let mut reports = Vec::with_capacity(attempts.len());
        for (name, handle) in attempts {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => FeedOutcome::Failure(format!("attempt task failed: {join_error}")),
            };
            reports.push(FeedReport { name, outcome });
        }
        reports
    }

    /// Flip the visibility gate without touching timers. While hidden,
    /// ticks of feeds polling faster than five minutes are suppressed;
    /// slow feeds keep refreshing in the background.
    pub fn set_visible(&self, visible: bool) {
        self.inner.visible.store(visible, Ordering::SeqCst);
    }

    pub fn is_visible(&self) -> bool {
        self.inner.visible.load(Ordering::SeqCst)
    }

    /// Point-in-time view of every feed, in registration order.
    pub fn snapshot(&self) -> Vec<FeedSnapshot> {
        self.inner.feeds.iter().map(|feed| feed.snapshot()).collect()
    }

    /// Tear the schedule down for good.
    pub async fn shutdown(self) -> Result<(), SchedulerError> {
        self.inner.active.store(false, Ordering::SeqCst);
        for handle in self.inner.tickers.lock().unwrap_or_else(|e| e.into_inner()).drain(..) {
            handle.abort();
        }
        if let Some(mut cron) = self.inner.cron.lock().await.take() {
            cron.shutdown().await?;
        }
        Ok(())
    }
}
