use rust_data_readers::ingestion::csv::{read_csv_from_path, read_csv_from_reader, CsvOptions};
use rust_data_readers::reader::{CleanLevel, ReaderOptions, ReturnType, Row};
use rust_data_readers::types::Value;
use rust_data_readers::ReaderError;

const PEOPLE: &str = "tests/fixtures/people.csv";

#[test]
fn read_csv_from_path_yields_every_row_with_rownum() {
    let mut rdr = read_csv_from_path(PEOPLE, &CsvOptions::default(), ReaderOptions::default()).unwrap();
    assert_eq!(
        rdr.headers().unwrap(),
        vec![
            "id",
            "first_name",
            "last_name",
            "email_address",
            "term_code",
            "score",
            "active",
            "joined_date",
            "rownum"
        ]
    );

    let rows: Vec<Row> = rdr.by_ref().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 100);
    assert_eq!(rows[0].get("first_name"), Some(&Value::from("Ada")));
    assert_eq!(rows[99].get("rownum"), Some(&Value::Int64(100)));
    assert_eq!(rdr.record_num(), 100);
}

#[test]
fn skip_and_limit_number_rows_from_the_skip_offset() {
    let opts = ReaderOptions {
        skip_records: 10,
        max_records: Some(10),
        ..Default::default()
    };
    let rdr = read_csv_from_path(PEOPLE, &CsvOptions::default(), opts).unwrap();
    let rows: Vec<Row> = rdr.map(Result::unwrap).collect();

    let rownums: Vec<i64> = rows.iter().filter_map(|r| r.get("rownum").and_then(Value::as_i64)).collect();
    assert_eq!(rownums, (11..=20).collect::<Vec<_>>());
    assert_eq!(rows[0].get("id"), Some(&Value::from("11")));
    assert_eq!(rows[9].get("id"), Some(&Value::from("20")));
}

#[test]
fn skip_past_the_end_yields_nothing() {
    let opts = ReaderOptions {
        skip_records: 500,
        ..Default::default()
    };
    let mut rdr = read_csv_from_path(PEOPLE, &CsvOptions::default(), opts).unwrap();
    assert_eq!(rdr.headers().unwrap().len(), 9);
    assert!(rdr.next().is_none());
}

#[test]
fn empty_cells_are_null() {
    let opts = ReaderOptions {
        skip_records: 16,
        max_records: Some(1),
        ..Default::default()
    };
    let mut rdr = read_csv_from_path(PEOPLE, &CsvOptions::default(), opts).unwrap();
    let row = rdr.next().unwrap().unwrap();
    assert_eq!(row.get("id"), Some(&Value::from("17")));
    assert_eq!(row.get("email_address"), Some(&Value::Null));
}

#[test]
fn standardize_collapses_code_suffixes() {
    let opts = ReaderOptions {
        clean_headers: CleanLevel::Standardize,
        add_rownum: false,
        ..Default::default()
    };
    let mut rdr = read_csv_from_path(PEOPLE, &CsvOptions::default(), opts).unwrap();
    let headers = rdr.headers().unwrap();
    assert_eq!(headers[1], "firstname");
    assert_eq!(headers[4], "term");
    assert_eq!(headers.len(), 8);
}

#[test]
fn map_output_keeps_column_order() {
    let opts = ReaderOptions {
        return_type: ReturnType::Map,
        max_records: Some(1),
        ..Default::default()
    };
    let mut rdr = read_csv_from_path(PEOPLE, &CsvOptions::default(), opts).unwrap();
    let Row::Map(map) = rdr.next().unwrap().unwrap() else {
        panic!("expected a map row");
    };
    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    assert_eq!(keys.first(), Some(&"id"));
    assert_eq!(keys.last(), Some(&"rownum"));
    assert_eq!(map["rownum"], Value::Int64(1));
}

#[test]
fn tsv_without_header_row_gets_synthetic_names() {
    let csv_opts = CsvOptions {
        has_headers: false,
        ..CsvOptions::tsv()
    };
    let mut rdr = read_csv_from_path("tests/fixtures/people.tsv", &csv_opts, ReaderOptions::default()).unwrap();
    assert_eq!(rdr.headers().unwrap(), vec!["column_01", "column_02", "column_03", "rownum"]);

    let rows: Vec<Row> = rdr.map(Result::unwrap).collect();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0].get("column_02"), Some(&Value::from("full name")));
    assert_eq!(rows[3].get("column_03"), Some(&Value::Null));
}

#[test]
fn ragged_rows_are_padded_and_truncated() {
    let input = "a,b,c\n1\n1,2,3,4,5\n";
    let rdr = read_csv_from_reader(input.as_bytes(), &CsvOptions::default(), ReaderOptions::default());
    let rows: Vec<Row> = rdr.map(Result::unwrap).collect();

    assert_eq!(rows[0].len(), 4);
    assert_eq!(rows[0].get("b"), Some(&Value::Null));
    assert_eq!(rows[0].get("rownum"), Some(&Value::Int64(1)));
    assert_eq!(rows[1].len(), 4);
    assert_eq!(rows[1].get("c"), Some(&Value::from("3")));
    assert_eq!(rows[1].get("rownum"), Some(&Value::Int64(2)));
}

#[test]
fn duplicate_and_blank_headers_stay_addressable() {
    let input = "Name,name,,Total Amount\nAda,Lovelace,x,10\n";
    let mut rdr = read_csv_from_reader(input.as_bytes(), &CsvOptions::default(), ReaderOptions::default());
    assert_eq!(
        rdr.headers().unwrap(),
        vec!["name", "name_2", "column_03", "total_amount", "rownum"]
    );
    let row = rdr.next().unwrap().unwrap();
    let record = row.as_record().unwrap();
    assert_eq!(record["name_2"], Value::from("Lovelace"));
    assert_eq!(record[3], Value::from("10"));
}

#[test]
fn record_serializes_as_json_object() {
    let input = "id,name\n1,Ada\n";
    let opts = ReaderOptions {
        add_rownum: false,
        ..Default::default()
    };
    let mut rdr = read_csv_from_reader(input.as_bytes(), &CsvOptions::default(), opts);
    let row = rdr.next().unwrap().unwrap();
    assert_eq!(serde_json::to_string(&row).unwrap(), r#"{"id":"1","name":"Ada"}"#);
}

#[test]
fn undecodable_header_is_not_replaced_by_a_data_row() {
    let input: &[u8] = b"\xff,b\n1,2\n3,4\n";
    let mut rdr = read_csv_from_reader(input, &CsvOptions::default(), ReaderOptions::default());
    assert!(matches!(rdr.headers().unwrap_err(), ReaderError::Csv(_)));
    assert!(matches!(rdr.headers().unwrap_err(), ReaderError::SchemaUnavailable { .. }));
    assert!(rdr.next().is_none());
}
