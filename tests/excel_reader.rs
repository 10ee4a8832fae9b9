#![cfg(feature = "excel_test_writer")]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::NaiveDate;
use rust_data_readers::ingestion::excel::read_excel_from_path;
use rust_data_readers::ingestion::{open_path, ExcelSheetSelection, OpenOptions};
use rust_data_readers::reader::{ReaderOptions, Row};
use rust_data_readers::types::Value;
use rust_data_readers::ReaderError;

fn tmp_file(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("rust-data-readers-{name}-{nanos}.xlsx"))
}

// Sheet "Summary" holds a single note; sheet "People" starts with a blank row, then the header.
fn write_people_workbook(path: &PathBuf) {
    use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

    let mut wb = Workbook::new();
    let summary = wb.add_worksheet();
    summary.set_name("Summary").unwrap();
    summary.write_string(0, 0, "see People").unwrap();

    let ws = wb.add_worksheet();
    ws.set_name("People").unwrap();
    ws.write_string(1, 0, "ID").unwrap();
    ws.write_string(1, 1, "Full Name").unwrap();
    ws.write_string(1, 2, "Joined").unwrap();
    ws.write_string(1, 3, "Active").unwrap();

    let date_fmt = Format::new().set_num_format("yyyy-mm-dd");
    let people = [(1, "Ada Lovelace", (2024, 1, 15), true), (2, "Grace Hopper", (2024, 2, 29), false)];
    for (i, (id, name, (y, m, d), active)) in people.iter().enumerate() {
        let row = 2 + i as u32;
        ws.write_number(row, 0, *id).unwrap();
        ws.write_string(row, 1, *name).unwrap();
        let date = ExcelDateTime::from_ymd(*y, *m, *d).unwrap();
        ws.write_datetime_with_format(row, 2, &date, &date_fmt).unwrap();
        ws.write_boolean(row, 3, *active).unwrap();
    }
    // Row 4 leaves the name blank.
    ws.write_number(4, 0, 3).unwrap();

    wb.save(path).unwrap();
}

#[test]
fn named_sheet_uses_first_non_empty_row_as_header() {
    let path = tmp_file("people");
    write_people_workbook(&path);

    let sheet = ExcelSheetSelection::Named("People".to_string());
    let mut rdr = read_excel_from_path(&path, &sheet, ReaderOptions::default()).unwrap();
    assert_eq!(rdr.headers().unwrap(), vec!["id", "full_name", "joined", "active", "rownum"]);

    let rows: Vec<Row> = rdr.map(Result::unwrap).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].get("id"), Some(&Value::Float64(1.0)));
    assert_eq!(rows[0].get("full_name"), Some(&Value::from("Ada Lovelace")));
    assert_eq!(
        rows[1].get("joined"),
        Some(&Value::DateTime(
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap().and_hms_opt(0, 0, 0).unwrap()
        ))
    );
    assert_eq!(rows[1].get("active"), Some(&Value::Bool(false)));
    assert_eq!(rows[2].get("full_name"), Some(&Value::Null));
    assert_eq!(rows[2].get("rownum"), Some(&Value::Int64(3)));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn sheet_selection_by_position_and_default() {
    let path = tmp_file("sheets");
    write_people_workbook(&path);

    let mut first = read_excel_from_path(&path, &ExcelSheetSelection::First, ReaderOptions::default()).unwrap();
    assert_eq!(first.headers().unwrap(), vec!["see_people", "rownum"]);
    assert!(first.next().is_none());

    let mut second = read_excel_from_path(&path, &ExcelSheetSelection::Index(1), ReaderOptions::default()).unwrap();
    assert_eq!(second.headers().unwrap()[0], "id");

    let err = read_excel_from_path(&path, &ExcelSheetSelection::Index(9), ReaderOptions::default()).unwrap_err();
    assert!(matches!(err, ReaderError::InvalidColumnSpec { .. }));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn open_path_dispatches_workbooks_with_pagination() {
    let path = tmp_file("dispatch");
    write_people_workbook(&path);

    let opts = OpenOptions {
        excel_sheet: ExcelSheetSelection::Named("People".to_string()),
        reader: ReaderOptions {
            skip_records: 1,
            max_records: Some(1),
            ..Default::default()
        },
        ..Default::default()
    };
    let rows: Vec<Row> = open_path(&path, &opts).unwrap().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("full_name"), Some(&Value::from("Grace Hopper")));
    assert_eq!(rows[0].get("rownum"), Some(&Value::Int64(2)));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn missing_sheet_is_an_excel_error() {
    let path = tmp_file("missing");
    write_people_workbook(&path);

    let sheet = ExcelSheetSelection::Named("Nope".to_string());
    let err = read_excel_from_path(&path, &sheet, ReaderOptions::default()).unwrap_err();
    assert!(matches!(err, ReaderError::Excel(_)));

    let _ = std::fs::remove_file(&path);
}
