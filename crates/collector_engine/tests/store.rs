use collector_core::HarvestedRecord;
use collector_engine::{IncrementalStore, StoreError};
use serde_json::json;

fn record(value: serde_json::Value) -> HarvestedRecord {
    HarvestedRecord::from_value(value).expect("record must be an object")
}

fn deals(dates: &[&str]) -> Vec<HarvestedRecord> {
    dates
        .iter()
        .enumerate()
        .map(|(i, date)| record(json!({"id": i, "deal_date": date})))
        .collect()
}

#[test]
fn checkpoint_is_none_for_missing_or_empty_table() {
    let mut store = IncrementalStore::open_in_memory().unwrap();
    assert_eq!(store.resume_checkpoint("deals", "deal_date").unwrap(), None);

    store.replace("deals", &[], None).unwrap();
    assert_eq!(store.resume_checkpoint("deals", "deal_date").unwrap(), None);
}

#[test]
fn checkpoint_is_the_maximum_stored_date() {
    let mut store = IncrementalStore::open_in_memory().unwrap();
    let records = deals(&[
        "2023-01-05T00:00:00",
        "2023-03-20T10:30:00",
        "2023-02-11T00:00:00",
    ]);
    store.replace("deals", &records, None).unwrap();

    assert_eq!(
        store.resume_checkpoint("deals", "deal_date").unwrap(),
        Some("2023-03-20T10:30:00".to_string())
    );
}

#[test]
fn checkpoint_ignores_rows_without_the_field() {
    let mut store = IncrementalStore::open_in_memory().unwrap();
    let records = vec![
        record(json!({"id": 1})),
        record(json!({"id": 2, "deal_date": "2023-06-01T00:00:00"})),
    ];
    store.replace("deals", &records, None).unwrap();
    assert_eq!(
        store.resume_checkpoint("deals", "deal_date").unwrap(),
        Some("2023-06-01T00:00:00".to_string())
    );
}

#[test]
fn replace_is_idempotent() {
    let mut store = IncrementalStore::open_in_memory().unwrap();
    let records = deals(&["2023-01-01T00:00:00", "2023-01-02T00:00:00"]);

    let first = store.replace("deals", &records, None).unwrap();
    let rows_after_first = store.rows("deals").unwrap();
    let second = store.replace("deals", &records, None).unwrap();
    let rows_after_second = store.rows("deals").unwrap();

    assert_eq!(first, 2);
    assert_eq!(second, 2);
    assert_eq!(rows_after_first, rows_after_second);
}

#[test]
fn replace_discards_prior_contents() {
    let mut store = IncrementalStore::open_in_memory().unwrap();
    store
        .replace("deals", &deals(&["2023-01-01T00:00:00"]), None)
        .unwrap();
    store
        .replace("deals", &deals(&["2024-01-01T00:00:00"]), None)
        .unwrap();

    assert_eq!(store.count("deals").unwrap(), 1);
    assert_eq!(
        store.resume_checkpoint("deals", "deal_date").unwrap(),
        Some("2024-01-01T00:00:00".to_string())
    );
}

#[test]
fn index_is_rebuilt_when_requested() {
    let mut store = IncrementalStore::open_in_memory().unwrap();
    let records = deals(&["2023-01-01T00:00:00"]);

    store.replace("deals", &records, Some("deal_date")).unwrap();
    assert!(store.has_index("deals").unwrap());

    // The replace drops the table, taking the index with it; it comes back
    // only when asked for again.
    store.replace("deals", &records, None).unwrap();
    assert!(!store.has_index("deals").unwrap());
}

#[test]
fn hostile_identifiers_are_rejected_before_any_statement_runs() {
    let mut store = IncrementalStore::open_in_memory().unwrap();
    let err = store
        .replace("deals; DROP TABLE deals", &[], None)
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidIdentifier(_)));

    let err = store
        .resume_checkpoint("deals", "x') FROM sqlite_master --")
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidIdentifier(_)));
}

#[test]
fn payloads_round_trip_as_stored_json() {
    let mut store = IncrementalStore::open_in_memory().unwrap();
    let records = vec![record(json!({"id": 1, "nested": {"a": [1, 2]}}))];
    store.replace("items", &records, None).unwrap();

    let rows = store.rows("items").unwrap();
    assert_eq!(rows.len(), 1);
    let reread: serde_json::Value = serde_json::from_str(&rows[0]).unwrap();
    assert_eq!(reread, json!({"id": 1, "nested": {"a": [1, 2]}}));
}
