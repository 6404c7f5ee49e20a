use crate::feed::FeedDef;

/// Global distributed slice for collecting `#[feed]` functions
#[linkme::distributed_slice]
pub static FEED_DEFS: [fn() -> FeedDef] = [..];
