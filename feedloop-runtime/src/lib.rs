//! Feedloop Runtime - polling engine for real-time dashboard feeds
//!
//! This crate provides the runtime that keeps a set of named data feeds
//! fresh against rate-limited upstreams: per-feed overlap guards, capped
//! exponential backoff on failure, and a visibility gate that quiets fast
//! feeds while the consuming surface is hidden.

mod config;
mod error;
mod feed;
mod observer;
mod registry;
mod scheduler;

// Re-export public API
pub use config::{load_toml_config, load_yaml_config};
pub use error::SchedulerError;
pub use feed::{FeedDef, FeedError, FeedHandler, FeedResult, TimeUnit};
pub use linkme;
pub use observer::{FeedObserver, SkipReason, TracingObserver};
pub use registry::FEED_DEFS;
pub use scheduler::{FeedOutcome, FeedReport, FeedSnapshot, Scheduler, SchedulerBuilder};
