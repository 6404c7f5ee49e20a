use chrono::Local;
use feedloop::{feed, FeedResult, SchedulerBuilder};

/// Simulated price ticker, every 2 seconds
#[feed(interval = "2s")]
async fn market_ticker() -> FeedResult {
    let now = Local::now().format("%H:%M:%S%.3f");
    println!("[{}] [MARKET] BTC 67_431.20 / ETH 3_540.85", now);
    Ok(())
}

/// Simulated news wire, every 5 seconds
#[feed(interval = "5s")]
async fn news_wire() -> FeedResult {
    let now = Local::now().format("%H:%M:%S%.3f");
    println!("[{}] [NEWS] 3 fresh headlines", now);
    Ok(())
}

/// Calendar feed: digest at the top of every minute
#[feed(cron = "0 * * * * *")]
async fn minute_digest() -> FeedResult {
    let now = Local::now().format("%H:%M:%S%.3f");
    println!("[{}] [DIGEST] rolling up the last minute", now);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), feedloop::SchedulerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("🚀 Starting feed polling (2s market, 5s news, minutely digest)...\n");

    let scheduler = SchedulerBuilder::new().register_all().build()?;
    scheduler.start_all().await?;

    println!("✅ Polling! Press Ctrl+C to stop.\n");

    tokio::signal::ctrl_c().await.ok();

    println!("\n👋 Shutting down...");
    scheduler.shutdown().await?;
    Ok(())
}
