use chrono::NaiveDateTime;

use crate::dates::DateFormat;
use crate::router::SinkSpec;

/// Immutable per-source declaration, passed explicitly into the planner,
/// resolver and router. One value per source; never mutated at runtime.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub name: String,
    pub base_url: String,
    pub page_size: u64,
    /// Whether the source requires date bounds on every request.
    pub date_required: bool,
    pub date_format: DateFormat,
    pub default_from_date: Option<String>,
    /// Set only for sources that stopped publishing.
    pub default_until_date: Option<String>,
    /// The first sink is the main table; its `date_column` drives the
    /// resume checkpoint.
    pub sinks: Vec<SinkSpec>,
}

impl SourceConfig {
    /// The sink whose table carries the resume checkpoint.
    pub fn main_sink(&self) -> Option<&SinkSpec> {
        self.sinks.first()
    }
}

/// Caller-supplied parameters for one run. All optional; unparsed strings
/// are validated before any network activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunParams {
    pub from_date: Option<String>,
    pub until_date: Option<String>,
    /// Overrides the crawl's start time, which partitions exported files.
    pub crawl_time: Option<String>,
    /// The previous run's observed total, enabling the zero-delta shortcut.
    pub last_total_count: Option<u64>,
}

/// Resolved inputs of one run. Created once per invocation and immutable
/// afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunContext {
    pub from_instant: Option<NaiveDateTime>,
    pub until_instant: Option<NaiveDateTime>,
    pub previous_total_count: Option<u64>,
    pub page_size: u64,
    pub crawl_time: NaiveDateTime,
}
