use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use chrono::Local;
use feedloop::{FeedOutcome, SchedulerBuilder};

static PRICE_CALLS: AtomicU32 = AtomicU32::new(0);

fn stamp() -> String {
    Local::now().format("%H:%M:%S%.3f").to_string()
}

#[tokio::main]
async fn main() -> Result<(), feedloop::SchedulerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    println!("🚀 Dashboard simulation: flaky prices (1s), news (5s), risk gauge (10s)\n");

    let scheduler = SchedulerBuilder::new()
        .attempt_timeout(Duration::from_secs(10))
        .feed("prices", "1s", || async {
            // Every fourth call the simulated exchange rejects us, which
            // exercises the backoff path.
            tokio::time::sleep(Duration::from_millis(80)).await;
            if PRICE_CALLS.fetch_add(1, Ordering::SeqCst) % 4 == 3 {
                Err("429 too many requests".into())
            } else {
                println!("[{}] [PRICES] refreshed", stamp());
                Ok(())
            }
        })
        .feed("news", "5s", || async {
            tokio::time::sleep(Duration::from_millis(150)).await;
            println!("[{}] [NEWS] refreshed", stamp());
            Ok(())
        })
        .feed("risk", "10s", || async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            println!("[{}] [RISK] gauge recomputed", stamp());
            Ok(())
        })
        .build()?;

    scheduler.start_all().await?;
    tokio::time::sleep(Duration::from_secs(8)).await;

    println!("\n🔕 Surface hidden: fast feeds go quiet (set_visible(false))");
    scheduler.set_visible(false);
    tokio::time::sleep(Duration::from_secs(4)).await;

    println!("\n⏸️  Tab closed: pause_all() tears the timers down");
    scheduler.pause_all().await;
    tokio::time::sleep(Duration::from_secs(3)).await;

    println!("\n▶️  Tab re-opened: resume_all() catches every feed up immediately");
    scheduler.resume_all().await?;
    tokio::time::sleep(Duration::from_secs(4)).await;

    println!("\n🔁 Manual refresh button: trigger_all()");
    for report in scheduler.trigger_all().await {
        let verdict = match &report.outcome {
            FeedOutcome::Success => "ok".to_string(),
            FeedOutcome::Failure(reason) => format!("failed: {reason}"),
            FeedOutcome::Skipped(reason) => format!("skipped: {reason:?}"),
        };
        println!("  - {}: {}", report.name, verdict);
    }

    println!("\n📊 Final snapshot:");
    for feed in scheduler.snapshot() {
        println!(
            "  - {} every {:?}ms, failures={}, last attempt {:?}",
            feed.name, feed.interval_ms, feed.consecutive_failures, feed.last_attempt_at
        );
    }

    scheduler.shutdown().await?;
    println!("\n👋 Done");
    Ok(())
}
