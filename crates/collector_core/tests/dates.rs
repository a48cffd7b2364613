use collector_core::{parse_checkpoint, parse_crawl_time, resolve_window, DateError, DateFormat};
use pretty_assertions::assert_eq;

fn fixed_now() -> chrono::NaiveDateTime {
    DateFormat::DateTime.parse("2024-03-01T12:00:00").unwrap()
}

#[test]
fn four_granularities_parse() {
    assert_eq!(
        DateFormat::Date.parse("2023-05-04").unwrap().to_string(),
        "2023-05-04 00:00:00"
    );
    assert_eq!(
        DateFormat::DateTime
            .parse("2023-05-04T10:20:30")
            .unwrap()
            .to_string(),
        "2023-05-04 10:20:30"
    );
    assert_eq!(
        DateFormat::Year.parse("2023").unwrap().to_string(),
        "2023-01-01 00:00:00"
    );
    assert_eq!(
        DateFormat::YearMonth.parse("2023-05").unwrap().to_string(),
        "2023-05-01 00:00:00"
    );
}

#[test]
fn malformed_input_is_a_fatal_config_error() {
    let err = DateFormat::Date.parse("04/05/2023").unwrap_err();
    assert_eq!(
        err,
        DateError::InvalidDateFormat {
            expected: "date",
            input: "04/05/2023".to_string(),
        }
    );
    assert!(DateFormat::Year.parse("23").is_err());
    assert!(DateFormat::YearMonth.parse("2023").is_err());
    assert!(DateFormat::DateTime.parse("2023-05-04").is_err());
}

#[test]
fn optional_source_without_overrides_is_unfiltered() {
    let window = resolve_window(
        None,
        None,
        false,
        Some("2022-01-01T00:00:00"),
        None,
        DateFormat::DateTime,
        fixed_now,
    )
    .unwrap();
    assert!(window.is_unbounded());
}

#[test]
fn required_source_falls_back_to_defaults_and_now() {
    let window = resolve_window(
        None,
        None,
        true,
        Some("2022-01-01T00:00:00"),
        None,
        DateFormat::DateTime,
        fixed_now,
    )
    .unwrap();
    assert_eq!(
        window.from,
        Some(DateFormat::DateTime.parse("2022-01-01T00:00:00").unwrap())
    );
    assert_eq!(window.until, Some(fixed_now()));
}

#[test]
fn one_override_activates_date_filtering_on_optional_sources() {
    let window = resolve_window(
        Some("2023-06-01"),
        None,
        false,
        Some("2022-01-01"),
        None,
        DateFormat::Date,
        fixed_now,
    )
    .unwrap();
    assert_eq!(window.from, Some(DateFormat::Date.parse("2023-06-01").unwrap()));
    assert_eq!(window.until, Some(fixed_now()));
}

#[test]
fn stopped_sources_default_until_their_last_publication() {
    let window = resolve_window(
        None,
        None,
        true,
        Some("2020"),
        Some("2022"),
        DateFormat::Year,
        fixed_now,
    )
    .unwrap();
    assert_eq!(window.until, Some(DateFormat::Year.parse("2022").unwrap()));
}

#[test]
fn overrides_win_over_defaults() {
    let window = resolve_window(
        Some("2023-02"),
        Some("2023-09"),
        true,
        Some("2022-01"),
        None,
        DateFormat::YearMonth,
        fixed_now,
    )
    .unwrap();
    assert_eq!(
        window.from,
        Some(DateFormat::YearMonth.parse("2023-02").unwrap())
    );
    assert_eq!(
        window.until,
        Some(DateFormat::YearMonth.parse("2023-09").unwrap())
    );
}

#[test]
fn required_source_without_default_from_is_rejected() {
    let err = resolve_window(None, None, true, None, None, DateFormat::Date, fixed_now)
        .unwrap_err();
    assert_eq!(err, DateError::MissingDefaultFromDate);
}

#[test]
fn checkpoint_strings_parse_at_any_stored_granularity() {
    assert_eq!(
        parse_checkpoint("2023-05-04T10:20:30").unwrap().to_string(),
        "2023-05-04 10:20:30"
    );
    assert_eq!(
        parse_checkpoint("2023-05-04 10:20:30").unwrap().to_string(),
        "2023-05-04 10:20:30"
    );
    assert_eq!(
        parse_checkpoint("2023-05-04").unwrap().to_string(),
        "2023-05-04 00:00:00"
    );
    assert!(parse_checkpoint("not a date").is_none());
}

#[test]
fn crawl_time_uses_space_separated_format() {
    assert_eq!(
        parse_crawl_time("2024-03-01 09:30:00").unwrap().to_string(),
        "2024-03-01 09:30:00"
    );
    assert!(parse_crawl_time("2024-03-01T09:30:00").is_err());
}
