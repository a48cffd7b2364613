//! Collector core: pure crawl-planning logic, no IO.
mod config;
mod dates;
mod pagination;
mod record;
mod router;

pub use config::{RunContext, RunParams, SourceConfig};
pub use dates::{
    crawl_dir_name, now_naive, parse_checkpoint, parse_crawl_time, resolve_window, DateError,
    DateFormat, DateWindow,
};
pub use pagination::{FirstPageOutcome, PageWindow, PaginationPlanner};
pub use record::HarvestedRecord;
pub use router::{ItemFilter, ItemRouter, SinkFormat, SinkSpec};
