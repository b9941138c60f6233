//! Normalization Scenario Tests
//!
//! Records flow from an in-memory store through the processor into frames

use reduct_client::{Bucket, MemoryStore, QueryOptions, Record, RecordStore};
use reduct_frames::{build_frames, parse_value, process, process_records, Frame, Kind, Mode, Value};
use serde_json::json;

fn frame<'a>(frames: &'a [Frame], name: &str) -> &'a Frame {
    frames
        .iter()
        .find(|f| f.name == name)
        .unwrap_or_else(|| panic!("no frame named {}", name))
}

async fn query_store(store: &MemoryStore, mode: Mode) -> Vec<Frame> {
    let bucket = store.bucket("test-bucket").await.unwrap();
    let stream = bucket.query("test-entry", &QueryOptions::default()).await.unwrap();
    build_frames(process(stream, mode).await.unwrap())
}

#[tokio::test]
async fn alternating_boolean_label() {
    let store = MemoryStore::new();
    for i in 0..10i64 {
        store.write(
            "test-bucket",
            "test-entry",
            Record::new(i * 1_000).with_label("bool-label", i % 2 == 0),
        );
    }

    let frames = query_store(&store, Mode::LabelOnly).await;
    let series = frame(&frames, "bool-label");

    assert_eq!(series.value_kind(), Some(Kind::Boolean));
    let expected: Vec<bool> = (0..10).map(|i| i % 2 == 0).collect();
    assert_eq!(series.value_field().unwrap().values.as_bool(), Some(&expected[..]));
}

#[tokio::test]
async fn integer_series_coerces_then_drops() {
    let store = MemoryStore::new();
    for (i, raw) in ["42", "21.9", "badInt"].into_iter().enumerate() {
        store.write(
            "test-bucket",
            "test-entry",
            Record::new(i as i64).with_label("int-label", raw),
        );
    }

    let frames = query_store(&store, Mode::LabelOnly).await;
    let series = frame(&frames, "int-label");

    assert_eq!(series.rows(), 2);
    assert_eq!(series.value_field().unwrap().values.as_int64(), Some(&[42, 21][..]));
}

#[tokio::test]
async fn json_content_keeps_native_kinds() {
    let store = MemoryStore::new();
    store.write(
        "test-bucket",
        "test-entry",
        Record::new(1)
            .with_label("ignored", "yes")
            .with_json(&json!({"temp": 25.5, "flag": true, "str_number": "123"})),
    );

    let frames = query_store(&store, Mode::ContentOnly).await;
    assert_eq!(frames.len(), 3);

    let temp = frame(&frames, "$.temp");
    assert_eq!(temp.value_field().unwrap().values.as_float64(), Some(&[25.5][..]));

    let flag = frame(&frames, "$.flag");
    assert_eq!(flag.value_field().unwrap().values.as_bool(), Some(&[true][..]));

    let str_number = frame(&frames, "$.str_number");
    assert_eq!(str_number.value_kind(), Some(Kind::String));
    assert_eq!(
        str_number.value_field().unwrap().values.as_strings(),
        Some(&["123".to_string()][..])
    );
}

#[tokio::test]
async fn label_only_emits_no_content_series() {
    let store = MemoryStore::new();
    store.write(
        "test-bucket",
        "test-entry",
        Record::new(1)
            .with_label("sensor", "a1")
            .with_json(&json!({"temp": 25.5, "nested": {"x": 1}})),
    );

    let frames = query_store(&store, Mode::LabelOnly).await;
    assert!(frames.iter().all(|f| !f.name.starts_with("$.")));
    assert_eq!(frames.len(), 1);
}

#[tokio::test]
async fn unspecified_mode_is_label_and_content() {
    let mode: Mode = "".parse().unwrap();
    assert_eq!(mode, Mode::LabelAndContent);

    let store = MemoryStore::new();
    store.write(
        "test-bucket",
        "test-entry",
        Record::new(1)
            .with_label("sensor", "a1")
            .with_json(&json!({"temp": 25.5})),
    );

    let frames = query_store(&store, mode).await;
    let mut names: Vec<&str> = frames.iter().map(|f| f.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["$.temp", "sensor"]);
}

#[test]
fn array_paths_align_across_records() {
    let records: Vec<Record> = (0..3)
        .map(|ts| Record::new(ts).with_json(&json!({"items": [{"name": "x"}, {"name": ts}]})))
        .collect();

    let acc = process_records(&records, Mode::ContentOnly);

    let first = acc.get("$.items[0].name").unwrap();
    assert_eq!(first.len(), 3);

    let second = acc.get("$.items[1].name").unwrap();
    assert_eq!(second.kind(), Kind::Float);
    assert_eq!(second.timestamps(), &[0, 1, 2]);
}

#[test]
fn drifting_label_keeps_first_kind_and_relative_order() {
    let raws = ["7", "x", "8.9", "true", "9"];
    let records: Vec<Record> = raws
        .iter()
        .enumerate()
        .map(|(ts, raw)| Record::new(ts as i64).with_label("k", *raw))
        .collect();

    let acc = process_records(&records, Mode::LabelOnly);
    let series = acc.get("k").unwrap();

    assert_eq!(series.kind(), Kind::Integer);
    assert_eq!(series.timestamps(), &[0, 2, 4]);
    assert_eq!(series.values().as_integers(), Some(&[7, 8, 9][..]));
    assert!(series.len() <= raws.len());
    assert_eq!(acc.stats().dropped, 2);
}

#[test]
fn emitted_values_reparse_to_the_same_kind() {
    let records: Vec<Record> = ["1.25", "-4", "false", "hello"]
        .iter()
        .enumerate()
        .map(|(ts, raw)| Record::new(ts as i64).with_label(format!("k{}", ts), *raw))
        .collect();

    let acc = process_records(&records, Mode::LabelOnly);
    for (_, series) in acc.iter() {
        let value = match series.values() {
            reduct_frames::SeriesValues::Integer(v) => Value::Integer(v[0]),
            reduct_frames::SeriesValues::Float(v) => Value::Float(v[0]),
            reduct_frames::SeriesValues::Boolean(v) => Value::Boolean(v[0]),
            reduct_frames::SeriesValues::String(v) => Value::String(v[0].clone()),
        };
        assert_eq!(parse_value(&value.to_string()), value);
    }
}
