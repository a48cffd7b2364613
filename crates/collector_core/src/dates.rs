use chrono::{NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("invalid {expected} value: {input:?}")]
    InvalidDateFormat {
        expected: &'static str,
        input: String,
    },
    #[error("source requires dates but declares no default from date")]
    MissingDefaultFromDate,
}

/// Granularity a source accepts for its date bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `YYYY-MM-DD`
    Date,
    /// `YYYY-MM-DDTHH:MM:SS`
    DateTime,
    /// `YYYY`
    Year,
    /// `YYYY-MM`
    YearMonth,
}

impl DateFormat {
    fn label(self) -> &'static str {
        match self {
            DateFormat::Date => "date",
            DateFormat::DateTime => "datetime",
            DateFormat::Year => "year",
            DateFormat::YearMonth => "year-month",
        }
    }

    /// Parses `input` at this granularity. Coarser granularities resolve to
    /// the start of their period (Jan 1st, first of month, midnight).
    pub fn parse(self, input: &str) -> Result<NaiveDateTime, DateError> {
        let invalid = || DateError::InvalidDateFormat {
            expected: self.label(),
            input: input.to_string(),
        };
        match self {
            DateFormat::Date => NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or_else(invalid),
            DateFormat::DateTime => NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S")
                .map_err(|_| invalid()),
            DateFormat::Year => {
                if input.len() != 4 {
                    return Err(invalid());
                }
                let year: i32 = input.parse().map_err(|_| invalid())?;
                NaiveDate::from_ymd_opt(year, 1, 1)
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .ok_or_else(invalid)
            }
            DateFormat::YearMonth => {
                let (year, month) = input.split_once('-').ok_or_else(invalid)?;
                if year.len() != 4 {
                    return Err(invalid());
                }
                let year: i32 = year.parse().map_err(|_| invalid())?;
                let month: u32 = month.parse().map_err(|_| invalid())?;
                NaiveDate::from_ymd_opt(year, month, 1)
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .ok_or_else(invalid)
            }
        }
    }

    /// Formats an instant back at this granularity.
    pub fn format(self, instant: NaiveDateTime) -> String {
        let pattern = match self {
            DateFormat::Date => "%Y-%m-%d",
            DateFormat::DateTime => "%Y-%m-%dT%H:%M:%S",
            DateFormat::Year => "%Y",
            DateFormat::YearMonth => "%Y-%m",
        };
        instant.format(pattern).to_string()
    }

    /// Rounds an instant down to this granularity.
    pub fn truncate(self, instant: NaiveDateTime) -> NaiveDateTime {
        // Format/parse round trip; both directions are total at the same
        // granularity, so the fallback cannot fire.
        self.parse(&self.format(instant)).unwrap_or(instant)
    }
}

/// The `[from, until]` bounds one run requests from its source.
///
/// Both bounds are `None` for sources that do not filter by date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateWindow {
    pub from: Option<NaiveDateTime>,
    pub until: Option<NaiveDateTime>,
}

impl DateWindow {
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.until.is_none()
    }
}

/// Computes the date window a run should request.
///
/// When `required` is false and no override is supplied, the source is not
/// filtered by date. Otherwise `from` falls back to `default_from` and
/// `until` to `default_until`, or to `now()` when the source is still
/// publishing. Parse failures are fatal configuration errors, raised before
/// any network activity.
pub fn resolve_window(
    from_override: Option<&str>,
    until_override: Option<&str>,
    required: bool,
    default_from: Option<&str>,
    default_until: Option<&str>,
    format: DateFormat,
    now: impl FnOnce() -> NaiveDateTime,
) -> Result<DateWindow, DateError> {
    if !required && from_override.is_none() && until_override.is_none() {
        return Ok(DateWindow::default());
    }

    let from = match from_override {
        Some(raw) => format.parse(raw)?,
        None => {
            let raw = default_from.ok_or(DateError::MissingDefaultFromDate)?;
            format.parse(raw)?
        }
    };
    let until = match until_override {
        Some(raw) => format.parse(raw)?,
        None => match default_until {
            Some(raw) => format.parse(raw)?,
            None => now(),
        },
    };

    Ok(DateWindow {
        from: Some(from),
        until: Some(until),
    })
}

/// Parses a checkpoint value read back from the store.
///
/// Stored payloads are opaque, so the date field may carry any of the
/// recognized granularities, or a full timestamp with a space separator.
pub fn parse_checkpoint(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(parsed);
    }
    for format in [
        DateFormat::DateTime,
        DateFormat::Date,
        DateFormat::YearMonth,
        DateFormat::Year,
    ] {
        if let Ok(parsed) = format.parse(raw) {
            return Some(parsed);
        }
    }
    None
}

/// Parses the `crawl_time` run parameter (`YYYY-MM-DD HH:MM:SS`).
pub fn parse_crawl_time(raw: &str) -> Result<NaiveDateTime, DateError> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map_err(|_| {
        DateError::InvalidDateFormat {
            expected: "crawl time",
            input: raw.to_string(),
        }
    })
}

/// Directory name for one crawl's exported files.
pub fn crawl_dir_name(crawl_time: NaiveDateTime) -> String {
    crawl_time.format("%Y%m%d_%H%M%S").to_string()
}

/// Current time, used when no `crawl_time` or until bound is supplied.
pub fn now_naive() -> NaiveDateTime {
    Utc::now().naive_utc()
}
