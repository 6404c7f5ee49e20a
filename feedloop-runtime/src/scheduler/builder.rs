use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use config::Config;

use super::scheduler::Scheduler;
use super::state::{BoxedAction, FeedState, Schedule};
use crate::config::{load_toml_config, load_yaml_config, resolve_config_value};
use crate::error::SchedulerError;
use crate::feed::{parse_interval_spec, FeedResult, TimeUnit};
use crate::observer::{FeedObserver, TracingObserver};
use crate::registry::FEED_DEFS;

enum ScheduleKind {
    Interval,
    Cron,
}

struct PendingFeed {
    name: String,
    kind: ScheduleKind,
    value: String,
    time_unit: String,
    enabled: String,
    action: BoxedAction,
}

/// Builder for the feed scheduler.
///
/// Feeds are registered here, before the single global start; the registry
/// is frozen once `build` runs. Registering a name twice overwrites the
/// prior definition (last write wins, first position kept).
pub struct SchedulerBuilder {
    config: Arc<Config>,
    pending: Vec<PendingFeed>,
    register_all: bool,
    observer: Arc<dyn FeedObserver>,
    attempt_timeout: Option<Duration>,
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerBuilder {
    /// Create a new builder with an empty config.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create with TOML config file
    pub fn with_toml<P: AsRef<Path>>(path: P) -> Result<Self, SchedulerError> {
        Ok(Self::with_config(load_toml_config(path)?))
    }

    /// Create with YAML config file
    pub fn with_yaml<P: AsRef<Path>>(path: P) -> Result<Self, SchedulerError> {
        Ok(Self::with_config(load_yaml_config(path)?))
    }

    /// Create with custom config
    pub fn with_config(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            pending: Vec::new(),
            register_all: false,
            observer: Arc::new(TracingObserver),
            attempt_timeout: None,
        }
    }

    /// Register an interval feed.
    ///
    /// `every` accepts shorthand durations ("500ms", "30s", "5m"), plain
    /// millisecond counts ("1500"), or config placeholders
    /// (`"${feeds.market.interval:60s}"`).
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use feedloop_runtime::SchedulerBuilder;
    /// let scheduler = SchedulerBuilder::new()
    ///     .feed("market", "10s", || async {
    ///         // fetch + render
    ///         Ok(())
    ///     })
    ///     .build()?;
    /// # Ok::<(), feedloop_runtime::SchedulerError>(())
    /// ```
    pub fn feed<F, Fut>(mut self, name: impl Into<String>, every: impl Into<String>, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FeedResult> + Send + 'static,
    {
        let action: BoxedAction = Arc::new(move || Box::pin(action()));
        self.pending.push(PendingFeed {
            name: name.into(),
            kind: ScheduleKind::Interval,
            value: every.into(),
            time_unit: "milliseconds".to_string(),
            enabled: "true".to_string(),
            action,
        });
        self
    }

    /// Register a calendar feed driven by a cron expression (six-field,
    /// seconds first). Config placeholders are resolved here too.
    pub fn cron_feed<F, Fut>(mut self, name: impl Into<String>, expr: impl Into<String>, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FeedResult> + Send + 'static,
    {
        let action: BoxedAction = Arc::new(move || Box::pin(action()));
        self.pending.push(PendingFeed {
            name: name.into(),
            kind: ScheduleKind::Cron,
            value: expr.into(),
            time_unit: "milliseconds".to_string(),
            enabled: "true".to_string(),
            action,
        });
        self
    }

    /// Also pull in every function annotated with `#[feed]`. Discovered
    /// feeds are processed before explicit registrations, so an explicit
    /// `feed()` with the same name overrides the annotation.
    pub fn register_all(mut self) -> Self {
        self.register_all = true;
        self
    }

    /// Replace the default `TracingObserver` with a custom outcome sink.
    pub fn observer<O: FeedObserver + 'static>(mut self, observer: O) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    /// Enforce a hard deadline per attempt. A timed-out attempt counts as
    /// a failure and releases the guard; without one, a hung action parks
    /// its feed in `running` forever (documented limitation).
    pub fn attempt_timeout(mut self, limit: Duration) -> Self {
        self.attempt_timeout = Some(limit);
        self
    }

    /// Resolve config, validate schedules, and produce the scheduler.
    pub fn build(self) -> Result<Scheduler, SchedulerError> {
        let mut pending = Vec::new();
        if self.register_all {
            for def_fn in FEED_DEFS {
                let def = def_fn();
                let kind = match def.schedule_type {
                    "interval" => ScheduleKind::Interval,
                    "cron" => ScheduleKind::Cron,
                    other => {
                        return Err(SchedulerError::UnknownScheduleType {
                            feed: def.name.to_string(),
                            kind: other.to_string(),
                        })
                    }
                };
                let handler = def.handler;
                pending.push(PendingFeed {
                    name: def.name.to_string(),
                    kind,
                    value: def.schedule_value.to_string(),
                    time_unit: def.time_unit.to_string(),
                    enabled: def.enabled.to_string(),
                    action: Arc::new(move || handler()),
                });
            }
        }
        pending.extend(self.pending);

        let mut feeds: Vec<Arc<FeedState>> = Vec::with_capacity(pending.len());
        let mut by_name: HashMap<String, usize> = HashMap::new();

        for entry in pending {
            let enabled = resolve_config_value(&entry.enabled, &self.config)?;
            if enabled.eq_ignore_ascii_case("false") {
                tracing::info!(feed = %entry.name, "feed disabled by config");
                continue;
            }

            let schedule = match entry.kind {
                ScheduleKind::Interval => {
                    let raw = resolve_config_value(&entry.value, &self.config)?;
                    let unit_str = resolve_config_value(&entry.time_unit, &self.config)?;
                    let unit = unit_str.parse::<TimeUnit>().unwrap_or_else(|_| {
                        tracing::warn!(
                            feed = %entry.name,
                            time_unit = %unit_str,
                            "invalid time unit, using milliseconds"
                        );
                        TimeUnit::Milliseconds
                    });
                    let millis = parse_interval_spec(&entry.name, &raw, unit)?;
                    Schedule::Interval(Duration::from_millis(millis))
                }
                ScheduleKind::Cron => Schedule::Cron(resolve_config_value(&entry.value, &self.config)?),
            };

            let state = Arc::new(FeedState::new(entry.name.clone(), schedule, entry.action));
            match by_name.get(&entry.name) {
                Some(&index) => {
                    tracing::debug!(feed = %entry.name, "feed re-registered, overwriting prior definition");
                    feeds[index] = state;
                }
                None => {
                    by_name.insert(entry.name, feeds.len());
                    feeds.push(state);
                }
            }
        }

        Ok(Scheduler::new(feeds, self.observer, self.attempt_timeout))
    }
}
