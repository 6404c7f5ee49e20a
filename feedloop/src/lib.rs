//! # Feedloop - Polling Scheduler for Real-Time Dashboards
//!
//! This library keeps dozens of independent data feeds (price tickers,
//! news wires, risk metrics) fresh against rate-limited upstream APIs.
//! Each feed pairs a name with a polling schedule and an async action;
//! the scheduler supplies the coordination the actions should not have
//! to: overlap deduplication, capped exponential backoff on failure, and
//! visibility-aware suppression while the consuming surface is hidden.
//!
//! ## Features
//!
//! - **At-most-one in flight**: a tick that lands while the previous
//!   attempt is still running is silently skipped, never queued
//! - **Exponential backoff**: a failing feed is retried after
//!   `interval * 2^failures`, capped at 32x; one success resets it fully
//! - **Visibility gate**: while the dashboard is hidden, feeds polling
//!   faster than five minutes go quiet; slow feeds keep refreshing
//! - **Cron feeds**: calendar-shaped jobs (a morning briefing, an hourly
//!   digest) via standard cron expressions
//! - **Config support**: placeholders like `${feeds.market.interval}`
//!   read intervals, cron expressions, and enable flags from TOML/YAML
//! - **Structured observability**: per-attempt outcomes flow into an
//!   injectable observer, defaulting to `tracing` events
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use feedloop::{feed, FeedResult, SchedulerBuilder};
//!
//! #[feed(interval = "10s")]
//! async fn market_ticker() -> FeedResult {
//!     // fetch prices, hand them to the render layer
//!     Ok(())
//! }
//!
//! #[feed(interval = "${feeds.news.interval:60s}")]
//! async fn news_wire() -> FeedResult {
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), feedloop::SchedulerError> {
//!     let scheduler = SchedulerBuilder::new()
//!         .register_all()
//!         .build()?;
//!
//!     scheduler.start_all().await?;
//!
//!     // Companion glue wires page visibility to the scheduler:
//!     // hidden -> scheduler.pause_all(), visible -> scheduler.resume_all()
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     scheduler.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! Create `config/feeds.toml`:
//!
//! ```toml
//! [feeds.news]
//! interval = "90s"
//! enabled = true
//! ```
//!
//! and load it with `SchedulerBuilder::with_toml("config/feeds.toml")`.
//! Environment variables with the `FEEDLOOP_` prefix override file values.

// Re-export macros
pub use feedloop_macro::feed;

// Re-export core types
pub use feedloop_runtime::{
    FeedError, FeedObserver, FeedOutcome, FeedReport, FeedResult, FeedSnapshot, Scheduler,
    SchedulerBuilder, SchedulerError, SkipReason, TimeUnit, TracingObserver,
};

// Make feedloop_runtime available for macro expansion
pub use feedloop_runtime;
