use std::io::Cursor;

use rust_data_readers::ingestion::json::{read_json_from_path, read_json_from_str, JsonOptions};
use rust_data_readers::ingestion::ndjson::{read_ndjson_from_path, read_ndjson_from_reader, NdjsonOptions};
use rust_data_readers::reader::{ReaderOptions, Row};
use rust_data_readers::types::Value;
use rust_data_readers::ReaderError;

#[test]
fn json_array_headers_are_sorted_key_union() {
    let mut rdr =
        read_json_from_path("tests/fixtures/people.json", &JsonOptions::default(), ReaderOptions::default()).unwrap();
    assert_eq!(
        rdr.headers().unwrap(),
        vec!["active", "id", "nickname", "score", "tags", "user", "rownum"]
    );

    let rows: Vec<Row> = rdr.map(Result::unwrap).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].get("id"), Some(&Value::Int64(1)));
    assert_eq!(rows[0].get("score"), Some(&Value::Float64(98.5)));
    assert_eq!(rows[1].get("active"), Some(&Value::Bool(false)));
    assert_eq!(rows[2].get("score"), Some(&Value::Null));
    assert_eq!(rows[2].get("nickname"), Some(&Value::Null));
    assert!(matches!(rows[0].get("user"), Some(Value::Json(v)) if v["name"] == "Ada"));
}

#[test]
fn json_flatten_joins_nested_keys_but_keeps_arrays() {
    let opts = JsonOptions { flatten: true };
    let mut rdr = read_json_from_path("tests/fixtures/people.json", &opts, ReaderOptions::default()).unwrap();
    assert_eq!(
        rdr.headers().unwrap(),
        vec!["active", "id", "nickname", "score", "tags", "user.geo.city", "user.name", "rownum"]
    );

    let rows: Vec<Row> = rdr.map(Result::unwrap).collect();
    assert_eq!(rows[0].get("user.geo.city"), Some(&Value::from("London")));
    assert_eq!(rows[1].get("user.geo.city"), Some(&Value::Null));
    assert_eq!(rows[1].get("user.name"), Some(&Value::from("Grace")));
    assert_eq!(rows[1].get("tags"), Some(&Value::Json(serde_json::json!([]))));
}

#[test]
fn json_empty_array_is_empty_input() {
    let mut rdr = read_json_from_str("[]", &JsonOptions::default(), ReaderOptions::default()).unwrap();
    assert!(matches!(rdr.headers().unwrap_err(), ReaderError::EmptyInput { .. }));
}

#[test]
fn json_empty_array_error_ends_iteration() {
    let rdr = read_json_from_str("[]", &JsonOptions::default(), ReaderOptions::default()).unwrap();
    let results: Vec<_> = rdr.collect();
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(ReaderError::EmptyInput { .. })));
}

#[test]
fn json_non_array_fails_at_construction() {
    let err = read_json_from_str(r#"{"id": 1}"#, &JsonOptions::default(), ReaderOptions::default()).unwrap_err();
    assert!(matches!(err, ReaderError::MalformedInput { .. }));
    assert!(err.to_string().contains("must be an array"));
}

#[test]
fn json_pagination_is_an_index_jump() {
    let opts = ReaderOptions {
        skip_records: 2,
        ..Default::default()
    };
    let rdr = read_json_from_str(r#"[{"n":1},{"n":2},{"n":3},{"n":4}]"#, &JsonOptions::default(), opts).unwrap();
    let rows: Vec<Row> = rdr.map(Result::unwrap).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("n"), Some(&Value::Int64(3)));
    assert_eq!(rows[0].get("rownum"), Some(&Value::Int64(3)));
}

#[test]
fn ndjson_skips_malformed_lines() {
    let mut rdr =
        read_ndjson_from_path("tests/fixtures/events.ndjson", &NdjsonOptions::default(), ReaderOptions::default())
            .unwrap();
    assert_eq!(
        rdr.headers().unwrap(),
        vec!["event_id", "event_type", "user", "amount", "rownum"]
    );

    let rows: Vec<Row> = rdr.by_ref().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("event_type"), Some(&Value::from("login")));
    assert_eq!(rows[0].get("amount"), Some(&Value::Null));
    assert_eq!(rows[1].get("event_id"), Some(&Value::Int64(12)));
    assert_eq!(rows[1].get("amount"), Some(&Value::Float64(19.99)));
    assert_eq!(rows[1].get("rownum"), Some(&Value::Int64(2)));
    assert_eq!(rdr.source().unwrap().skipped_lines(), 1);
}

#[test]
fn ndjson_headers_then_rows_see_the_same_bytes() {
    let input = "{\"a\":1}\n{\"a\":2,\"b\":true}\n{\"a\":3}\n";
    let mut rdr = read_ndjson_from_reader(
        Cursor::new(input.as_bytes()),
        &NdjsonOptions::default(),
        ReaderOptions::default(),
    );
    assert_eq!(rdr.headers().unwrap(), vec!["a", "b", "rownum"]);
    let ids: Vec<Value> = rdr.map(|r| r.unwrap().get("a").cloned().unwrap()).collect();
    assert_eq!(ids, vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)]);
}

#[test]
fn ndjson_without_objects_has_no_keys() {
    let mut rdr = read_ndjson_from_reader(
        Cursor::new(&b"\n[1,2]\n\"text\"\n"[..]),
        &NdjsonOptions::default(),
        ReaderOptions::default(),
    );
    let err = rdr.next().unwrap().unwrap_err();
    assert!(matches!(err, ReaderError::NoKeys { .. }));
}

#[test]
fn ndjson_flatten_uses_dotted_keys() {
    let opts = NdjsonOptions {
        flatten: true,
        ..Default::default()
    };
    let mut rdr =
        read_ndjson_from_path("tests/fixtures/events.ndjson", &opts, ReaderOptions::default()).unwrap();
    assert_eq!(
        rdr.headers().unwrap(),
        vec!["event_id", "event_type", "user.id", "amount", "rownum"]
    );
    let first = rdr.next().unwrap().unwrap();
    assert_eq!(first.get("user.id"), Some(&Value::Int64(7)));
}
