use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use feedloop_runtime::{FeedOutcome, SchedulerBuilder, SkipReason};
use tokio::time::{sleep, Instant};

fn counter() -> Arc<AtomicU32> {
    Arc::new(AtomicU32::new(0))
}

#[tokio::test(start_paused = true)]
async fn overlapping_ticks_are_skipped() {
    let in_flight = counter();
    let peak = counter();
    let calls = counter();

    let scheduler = {
        let in_flight = in_flight.clone();
        let peak = peak.clone();
        let calls = calls.clone();
        SchedulerBuilder::new()
            .feed("slow-upstream", "10ms", move || {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    // Holds the guard across several nominal periods.
                    sleep(Duration::from_millis(35)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .build()
            .unwrap()
    };

    scheduler.start_all().await.unwrap();
    sleep(Duration::from_millis(200)).await;
    scheduler.shutdown().await.unwrap();

    assert!(calls.load(Ordering::SeqCst) >= 2, "feed should keep polling");
    assert_eq!(peak.load(Ordering::SeqCst), 1, "attempts of one feed must never overlap");
}

#[tokio::test(start_paused = true)]
async fn failing_feed_backs_off_exponentially_and_recovers() {
    let attempts = Arc::new(Mutex::new(Vec::<Instant>::new()));
    let calls = counter();

    let scheduler = {
        let attempts = attempts.clone();
        let calls = calls.clone();
        SchedulerBuilder::new()
            // Fails on its first two calls, then succeeds.
            .feed("ping", "1s", move || {
                let attempts = attempts.clone();
                let calls = calls.clone();
                async move {
                    attempts.lock().unwrap().push(Instant::now());
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("upstream down".into())
                    } else {
                        Ok(())
                    }
                }
            })
            .build()
            .unwrap()
    };

    scheduler.start_all().await.unwrap();
    sleep(Duration::from_millis(7500)).await;
    scheduler.shutdown().await.unwrap();

    let attempts = attempts.lock().unwrap();
    // t=0 fail, honored retry at 2s (2^1) fails, honored retry at 6s
    // (2^2 after the second failure) succeeds, nominal tick at 7s.
    assert_eq!(attempts.len(), 4, "expected attempts at 0s, 2s, 6s and 7s");

    let gap = |i: usize| attempts[i].duration_since(attempts[i - 1]);
    assert!(gap(1) >= Duration::from_millis(2000) && gap(1) < Duration::from_millis(2100));
    assert!(gap(2) >= Duration::from_millis(4000) && gap(2) < Duration::from_millis(4100));
    // Success clears the backoff: the very next nominal tick is honored.
    assert!(gap(3) >= Duration::from_millis(1000) && gap(3) < Duration::from_millis(1100));
}

#[tokio::test(start_paused = true)]
async fn failure_count_caps_at_five() {
    let scheduler = SchedulerBuilder::new()
        .feed("flaky", "1s", || async { Err("nope".into()) })
        .build()
        .unwrap();

    assert!(scheduler.snapshot()[0].last_attempt_at.is_none());

    for _ in 0..10 {
        let reports = scheduler.trigger_all().await;
        assert!(matches!(reports[0].outcome, FeedOutcome::Failure(_)));
    }

    let snapshot = &scheduler.snapshot()[0];
    assert_eq!(snapshot.consecutive_failures, 5);
    assert!(snapshot.last_attempt_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn hidden_surface_suppresses_fast_feeds_only() {
    let fast = counter();
    let slow = counter();

    let scheduler = {
        let fast = fast.clone();
        let slow = slow.clone();
        SchedulerBuilder::new()
            .feed("ticker", "10s", move || {
                let fast = fast.clone();
                async move {
                    fast.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .feed("digest", "300s", move || {
                let slow = slow.clone();
                async move {
                    slow.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .build()
            .unwrap()
    };

    scheduler.start_all().await.unwrap();
    // Let the visible catch-up attempts land first.
    sleep(Duration::from_millis(1)).await;
    assert_eq!(fast.load(Ordering::SeqCst), 1);
    assert_eq!(slow.load(Ordering::SeqCst), 1);

    scheduler.set_visible(false);
    sleep(Duration::from_secs(950)).await;
    scheduler.shutdown().await.unwrap();

    // 95 ticks of the fast feed all suppressed; the five-minute digest
    // kept polling in the background.
    assert_eq!(fast.load(Ordering::SeqCst), 1);
    assert_eq!(slow.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn resume_fires_an_immediate_catchup_attempt() {
    let market = counter();
    let news = counter();

    let scheduler = {
        let market = market.clone();
        let news = news.clone();
        SchedulerBuilder::new()
            .feed("market", "60s", move || {
                let market = market.clone();
                async move {
                    market.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .feed("news", "90s", move || {
                let news = news.clone();
                async move {
                    news.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .build()
            .unwrap()
    };

    scheduler.start_all().await.unwrap();
    sleep(Duration::from_millis(1)).await;
    assert_eq!(market.load(Ordering::SeqCst), 1);
    assert_eq!(news.load(Ordering::SeqCst), 1);

    scheduler.pause_all().await;
    scheduler.pause_all().await; // idempotent
    sleep(Duration::from_secs(600)).await;
    assert_eq!(market.load(Ordering::SeqCst), 1, "paused feeds must not tick");
    assert_eq!(news.load(Ordering::SeqCst), 1);

    scheduler.resume_all().await.unwrap();
    scheduler.resume_all().await.unwrap(); // idempotent
    sleep(Duration::from_millis(1)).await;
    scheduler.shutdown().await.unwrap();

    // One catch-up attempt each, well before the next natural tick.
    assert_eq!(market.load(Ordering::SeqCst), 2);
    assert_eq!(news.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn trigger_all_settles_every_feed_independently() {
    let mut builder = SchedulerBuilder::new();
    for i in 1..=5 {
        let name = format!("feed-{i}");
        if i == 3 {
            builder = builder.feed(name, "1m", || async { Err("exchange quota exceeded".into()) });
        } else {
            builder = builder.feed(name, "1m", || async { Ok(()) });
        }
    }
    let scheduler = builder.build().unwrap();

    let reports = scheduler.trigger_all().await;

    assert_eq!(reports.len(), 5);
    let names: Vec<_> = reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["feed-1", "feed-2", "feed-3", "feed-4", "feed-5"]);

    for (i, report) in reports.iter().enumerate() {
        match (i, &report.outcome) {
            (2, FeedOutcome::Failure(reason)) => assert!(reason.contains("quota")),
            (2, other) => panic!("feed-3 should fail, got {other:?}"),
            (_, FeedOutcome::Success) => {}
            (_, other) => panic!("expected success, got {other:?}"),
        }
    }
}

#[tokio::test(start_paused = true)]
async fn trigger_all_reports_hidden_skips() {
    let scheduler = SchedulerBuilder::new()
        .feed("ticker", "10s", || async { Ok(()) })
        .feed("digest", "10m", || async { Ok(()) })
        .build()
        .unwrap();

    scheduler.set_visible(false);
    let reports = scheduler.trigger_all().await;

    assert_eq!(reports[0].outcome, FeedOutcome::Skipped(SkipReason::Hidden));
    assert_eq!(reports[1].outcome, FeedOutcome::Success);
}

#[tokio::test(start_paused = true)]
async fn failed_attempt_releases_the_guard() {
    let calls = counter();
    let scheduler = {
        let calls = calls.clone();
        SchedulerBuilder::new()
            .feed("flaky", "1s", move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("still down".into())
                }
            })
            .build()
            .unwrap()
    };

    for _ in 0..2 {
        let reports = scheduler.trigger_all().await;
        assert!(matches!(reports[0].outcome, FeedOutcome::Failure(_)));
    }
    // A failure must never leave the feed stuck in `running`.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!scheduler.snapshot()[0].running);
}

#[tokio::test(start_paused = true)]
async fn attempt_timeout_converts_a_hang_into_a_failure() {
    let calls = counter();
    let scheduler = {
        let calls = calls.clone();
        SchedulerBuilder::new()
            .attempt_timeout(Duration::from_millis(10))
            .feed("stuck", "1s", move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    sleep(Duration::from_secs(3600)).await;
                    Ok(())
                }
            })
            .build()
            .unwrap()
    };

    for _ in 0..2 {
        let reports = scheduler.trigger_all().await;
        match &reports[0].outcome {
            FeedOutcome::Failure(reason) => assert!(reason.contains("exceeded")),
            other => panic!("expected timeout failure, got {other:?}"),
        }
    }
    // The deadline released the guard both times.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(scheduler.snapshot()[0].consecutive_failures, 2);
}

#[tokio::test(start_paused = true)]
async fn duplicate_registration_overwrites_the_prior_definition() {
    let first = counter();
    let second = counter();

    let scheduler = {
        let first = first.clone();
        let second = second.clone();
        SchedulerBuilder::new()
            .feed("market", "1s", move || {
                let first = first.clone();
                async move {
                    first.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .feed("market", "2s", move || {
                let second = second.clone();
                async move {
                    second.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .build()
            .unwrap()
    };

    let snapshot = scheduler.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].interval_ms, Some(2000));

    scheduler.trigger_all().await;
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalid_cron_expression_fails_start() {
    let scheduler = SchedulerBuilder::new()
        .cron_feed("briefing", "not a cron expression", || async { Ok(()) })
        .build()
        .unwrap();

    assert!(scheduler.start_all().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn config_placeholders_drive_intervals() {
    let config = config::Config::builder()
        .add_source(config::File::from_str(
            "[feeds]\nmarket_interval = \"45s\"\n",
            config::FileFormat::Toml,
        ))
        .build()
        .unwrap();

    let scheduler = SchedulerBuilder::with_config(config)
        .feed("market", "${feeds.market_interval}", || async { Ok(()) })
        .feed("news", "${feeds.news_interval:90s}", || async { Ok(()) })
        .build()
        .unwrap();

    let snapshot = scheduler.snapshot();
    assert_eq!(snapshot[0].interval_ms, Some(45_000));
    assert_eq!(snapshot[1].interval_ms, Some(90_000));
}

#[test]
fn invalid_interval_fails_build() {
    let result = SchedulerBuilder::new()
        .feed("broken", "whenever", || async { Ok(()) })
        .build();
    assert!(result.is_err());

    let result = SchedulerBuilder::new()
        .feed("zero", "0", || async { Ok(()) })
        .build();
    assert!(result.is_err());
}
