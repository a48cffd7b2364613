use collector_core::{DateWindow, HarvestedRecord, PageWindow, SourceConfig};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::fetch::FetchDescriptor;

/// Date format the upstream APIs expect inside page filter bodies.
const FILTER_DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected a JSON array of records")]
    NotAList,
    #[error("list entry is not a JSON object")]
    NotAnObject,
}

/// Static filter fields distinguishing one first request from another, for
/// sources that split their extent across several entry points. Each
/// variant paginates independently.
pub type RequestVariant = Map<String, Value>;

/// One item recovered from a list page: either a finished record, or a
/// follow-up detail fetch whose response yields the record(s). Carried
/// parent fields are attached to every record the detail fetch produces.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedItem {
    Record(HarvestedRecord),
    Detail {
        descriptor: FetchDescriptor,
        carry: Map<String, Value>,
    },
}

/// Everything source-specific about talking to one paginated API: how to
/// shape a page request, where the self-reported total lives, and how list
/// and detail responses decompose into records.
///
/// The defaults implement the common protocol (POST JSON filters with
/// offset and date bounds, responses as arrays of objects, the total on the
/// first entry); sources override only what differs.
pub trait SourceProtocol: Send + Sync {
    fn config(&self) -> &SourceConfig;

    /// One first request is issued per variant.
    fn variants(&self) -> Vec<RequestVariant> {
        vec![Map::new()]
    }

    /// Request body for one page window. Date bounds are included only when
    /// the run's window carries them.
    fn build_filters(
        &self,
        window: PageWindow,
        dates: &DateWindow,
        variant: &RequestVariant,
    ) -> Value {
        let mut filters = Map::new();
        filters.insert("from".to_string(), json!(window.offset_start));
        filters.insert("to".to_string(), json!(window.offset_end));
        if let Some(from) = dates.from {
            filters.insert(
                "date_from".to_string(),
                json!(from.format(FILTER_DATE_FORMAT).to_string()),
            );
        }
        if let Some(until) = dates.until {
            filters.insert(
                "date_to".to_string(),
                json!(until.format(FILTER_DATE_FORMAT).to_string()),
            );
        }
        for (name, value) in variant {
            filters.insert(name.clone(), value.clone());
        }
        Value::Object(filters)
    }

    fn page_request(
        &self,
        window: PageWindow,
        dates: &DateWindow,
        variant: &RequestVariant,
    ) -> FetchDescriptor {
        FetchDescriptor::post_json(
            &self.config().base_url,
            self.build_filters(window, dates, variant),
        )
    }

    /// The source-reported total for the run, read off the first page.
    /// An empty first page means an empty source.
    fn total_count(&self, body: &Value) -> u64 {
        body.as_array()
            .and_then(|items| items.first())
            .and_then(|item| item.get("total_count"))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// Decomposes a list response into records and follow-up fetches.
    fn parse_page(&self, body: Value) -> Result<Vec<ParsedItem>, ParseError> {
        let Value::Array(items) = body else {
            return Err(ParseError::NotAList);
        };
        items
            .into_iter()
            .map(|item| {
                HarvestedRecord::from_value(item)
                    .map(ParsedItem::Record)
                    .ok_or(ParseError::NotAnObject)
            })
            .collect()
    }

    /// Decomposes a detail response. Carried parent fields are attached to
    /// every record, replacing source-supplied values of the same name.
    fn parse_detail(
        &self,
        body: Value,
        carry: &Map<String, Value>,
    ) -> Result<Vec<HarvestedRecord>, ParseError> {
        let items = match body {
            Value::Array(items) => items,
            item @ Value::Object(_) => vec![item],
            _ => return Err(ParseError::NotAList),
        };
        items
            .into_iter()
            .map(|item| {
                let mut record =
                    HarvestedRecord::from_value(item).ok_or(ParseError::NotAnObject)?;
                for (field, value) in carry {
                    record.set(field.clone(), value.clone());
                }
                Ok(record)
            })
            .collect()
    }
}
