// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use chrono::NaiveDate;
use graph::value;

use crate::{
    BinaryFileStore, JsonFileStore, LiteralSource, ModifiedTimeSource, PathSource, TextFileStore,
    Timestamp, TouchFileStore, ValueStore,
};

#[test]
fn binary_file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = BinaryFileStore::new(dir.path().join("data.bin"));
    assert!(store.get_modified_time().unwrap().is_none());
    assert!(store.read().is_err());

    store.write(&value::new(vec![1_u8, 2, 3])).unwrap();
    assert!(store.get_modified_time().unwrap().is_some());
    let read = store.read().unwrap();
    assert_eq!(value::get::<Vec<u8>>(&read).unwrap(), &vec![1_u8, 2, 3]);
}

#[test]
fn text_file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = TextFileStore::new(dir.path().join("data.txt"));
    store.write(&value::new("hello".to_owned())).unwrap();
    let read = store.read().unwrap();
    assert_eq!(value::get::<String>(&read).unwrap(), "hello");
}

#[test]
fn json_file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("data.json"));
    let json = serde_json::json!({"xs": [1, 2, 3]});
    store.write(&value::new(json.clone())).unwrap();
    let read = store.read().unwrap();
    assert_eq!(value::get::<serde_json::Value>(&read).unwrap(), &json);
}

#[test]
fn wrong_value_type_leaves_no_file_behind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.bin");
    let store = BinaryFileStore::new(&path);
    assert!(store.write(&value::new("not bytes".to_owned())).is_err());
    assert!(!path.exists());
    assert!(!dir.path().join("data.bin.STAGING").exists());
}

#[test]
fn touch_file_store_stores_unit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("done.touch");
    let store = TouchFileStore::new(&path);
    assert!(store.write(&value::new(1_i64)).is_err());
    store.write(&value::new(())).unwrap();
    assert!(path.exists());
    store.read().unwrap();

    std::fs::write(&path, b"junk").unwrap();
    assert!(store.read().is_err());
}

#[test]
fn path_source_returns_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.csv");

    let required = PathSource::new(&path);
    assert!(required.get_modified_time().is_err());

    let optional = PathSource::optional(&path);
    assert!(optional.get_modified_time().unwrap().is_none());
    // A missing optional path still fails when actually read.
    assert!(optional.read().is_err());

    std::fs::write(&path, b"a,b\n").unwrap();
    assert!(required.get_modified_time().unwrap().is_some());
    let read = required.read().unwrap();
    assert_eq!(
        value::get::<std::path::PathBuf>(&read).unwrap(),
        &path
    );
}

#[test]
fn literal_and_modified_time_sources() {
    let t = Timestamp::from(
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap(),
    );
    let literal = LiteralSource::new(value::new(42_i64), Some(t));
    assert_eq!(value::get::<i64>(&literal.read().unwrap()), Some(&42));
    assert_eq!(literal.get_modified_time().unwrap(), Some(t));
    assert!(literal.write(&value::new(1_i64)).is_err());

    let modified = ModifiedTimeSource::new(Some(t));
    assert_eq!(modified.get_modified_time().unwrap(), Some(t));
}

#[test]
fn timestamps_normalise_to_naive_utc() {
    let naive = NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    assert_eq!(Timestamp::Naive(naive).to_naive_utc(), naive);

    let eastern = chrono::FixedOffset::west_opt(5 * 3600).unwrap();
    let aware = naive
        .and_local_timezone(eastern)
        .single()
        .map(Timestamp::from)
        .unwrap();
    // 12:00 at UTC-5 is 17:00 UTC.
    assert_eq!(
        aware.to_naive_utc(),
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(17, 0, 0)
            .unwrap()
    );
}
