use std::fmt;
use std::sync::Arc;

use crate::record::HarvestedRecord;

/// File encodings a sink can request for its exported output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkFormat {
    /// One JSON object per line. Always readable back by the store step.
    JsonLines,
    /// Flat CSV over the record's top-level fields.
    Csv,
}

/// Membership test deciding whether a sink takes a record.
///
/// Implementations must be pure and total: no side effects, no panics on
/// any record shape the source actually produces. Check field presence
/// defensively rather than assuming it.
pub trait ItemFilter: Send + Sync {
    fn accepts(&self, record: &HarvestedRecord) -> bool;
}

impl<F> ItemFilter for F
where
    F: Fn(&HarvestedRecord) -> bool + Send + Sync,
{
    fn accepts(&self, record: &HarvestedRecord) -> bool {
        self(record)
    }
}

/// Static declaration of one named output stream of a source.
#[derive(Clone)]
pub struct SinkSpec {
    pub name: String,
    /// `None` accepts every record.
    pub filter: Option<Arc<dyn ItemFilter>>,
    pub formats: Vec<SinkFormat>,
    /// Field whose stored maximum is the resume checkpoint for this sink.
    pub date_column: Option<String>,
    /// Field to (re)index after each table replace.
    pub index: Option<String>,
    /// Truncate exported files each run instead of appending. Sinks without
    /// true incremental fetch refetch their whole extent, so appending
    /// would duplicate rows.
    pub overwrite: bool,
}

impl SinkSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filter: None,
            formats: vec![SinkFormat::Csv],
            date_column: None,
            index: None,
            overwrite: false,
        }
    }

    pub fn with_filter(mut self, filter: Arc<dyn ItemFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_formats(mut self, formats: Vec<SinkFormat>) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_date_column(mut self, field: impl Into<String>) -> Self {
        self.date_column = Some(field.into());
        self
    }

    pub fn with_index(mut self, field: impl Into<String>) -> Self {
        self.index = Some(field.into());
        self
    }

    pub fn with_overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }

    fn accepts(&self, record: &HarvestedRecord) -> bool {
        match &self.filter {
            Some(filter) => filter.accepts(record),
            None => true,
        }
    }
}

impl fmt::Debug for SinkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkSpec")
            .field("name", &self.name)
            .field("filtered", &self.filter.is_some())
            .field("formats", &self.formats)
            .field("date_column", &self.date_column)
            .field("index", &self.index)
            .field("overwrite", &self.overwrite)
            .finish()
    }
}

/// Assigns each harvested record to zero or more named sinks.
///
/// Every predicate is evaluated in declaration order; evaluations are
/// independent of one another. Records matching no sink are dropped from
/// every stream, but the caller may still count them for diagnostics.
#[derive(Debug, Clone)]
pub struct ItemRouter {
    sinks: Vec<SinkSpec>,
}

impl ItemRouter {
    pub fn new(sinks: Vec<SinkSpec>) -> Self {
        Self { sinks }
    }

    pub fn sinks(&self) -> &[SinkSpec] {
        &self.sinks
    }

    /// Indices into `sinks()` of every sink accepting the record.
    pub fn route(&self, record: &HarvestedRecord) -> Vec<usize> {
        self.sinks
            .iter()
            .enumerate()
            .filter(|(_, sink)| sink.accepts(record))
            .map(|(index, _)| index)
            .collect()
    }
}
