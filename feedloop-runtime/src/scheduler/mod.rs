mod builder;
mod scheduler;
mod state;

pub use builder::SchedulerBuilder;
pub use scheduler::Scheduler;
pub use state::{FeedOutcome, FeedReport, FeedSnapshot};
