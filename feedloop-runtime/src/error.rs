use thiserror::Error;

/// Errors raised by the scheduler's own machinery. Feed actions never
/// surface here: their failures are absorbed by the backoff tracker.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid interval '{value}' for feed '{feed}'")]
    InvalidInterval { feed: String, value: String },

    #[error("unknown schedule type '{kind}' for feed '{feed}'")]
    UnknownScheduleType { feed: String, kind: String },

    #[error("missing config key '{0}'")]
    MissingConfigKey(String),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("cron scheduler error: {0}")]
    Cron(#[from] tokio_cron_scheduler::JobSchedulerError),
}
