#![cfg(feature = "excel")]

//! Spreadsheet row source (`.xlsx`, `.xls`, `.xlsm`, `.xlsb`, `.ods`).
//!
//! Behavior:
//! - Picks the sheet named by [`ExcelSheetSelection`]; defaults to the first sheet in the workbook
//! - Detects the first non-empty row as the header row
//! - Data rows are the rows after it, addressed by index, so skipping is a cursor jump

use std::path::Path;

use calamine::{open_workbook_auto, Data, DataType, Range, Reader as _};

use super::unified::ExcelSheetSelection;
use crate::error::{ReaderError, ReaderResult};
use crate::reader::{Reader, ReaderOptions, RowSource};
use crate::types::Value;

/// Raw rows from one worksheet.
pub struct ExcelSource {
    sheet: String,
    range: Range<Data>,
    header_row: Option<usize>,
    next: usize,
}

impl ExcelSource {
    /// Use an already-loaded sheet range.
    pub fn from_range(sheet: impl Into<String>, range: Range<Data>) -> Self {
        let header_row = range
            .rows()
            .position(|row| row.iter().any(|c| !matches!(c, Data::Empty)));
        Self {
            sheet: sheet.into(),
            range,
            next: header_row.map_or(0, |h| h + 1),
            header_row,
        }
    }

    /// Open a workbook and load the selected sheet.
    pub fn from_path(path: impl AsRef<Path>, sheet: &ExcelSheetSelection) -> ReaderResult<Self> {
        let mut workbook = open_workbook_auto(path)?;
        let names = workbook.sheet_names();
        if names.is_empty() {
            return Err(ReaderError::EmptyInput {
                message: "workbook has no sheets".to_string(),
            });
        }

        let name = match sheet {
            ExcelSheetSelection::First => names[0].clone(),
            ExcelSheetSelection::Named(name) => name.clone(),
            ExcelSheetSelection::Index(idx) => {
                names.get(*idx).cloned().ok_or_else(|| ReaderError::InvalidColumnSpec {
                    message: format!("sheet index {idx} out of range; workbook has {} sheets", names.len()),
                })?
            }
        };
        let range = workbook.worksheet_range(&name)?;
        Ok(Self::from_range(name, range))
    }

    /// Name of the sheet being read.
    pub fn sheet_name(&self) -> &str {
        &self.sheet
    }

    fn row_values(&self, idx: usize) -> Vec<Value> {
        (0..self.range.width())
            .map(|col| convert_cell(self.range.get((idx, col)).unwrap_or(&Data::Empty)))
            .collect()
    }
}

impl RowSource for ExcelSource {
    fn format_name(&self) -> &'static str {
        "excel"
    }

    fn read_headers(&mut self) -> ReaderResult<Vec<String>> {
        let Some(header_row) = self.header_row else {
            log::debug!("sheet '{}' has no non-empty rows", self.sheet);
            return Ok(Vec::new());
        };
        Ok((0..self.range.width())
            .map(|col| cell_to_header_string(self.range.get((header_row, col)).unwrap_or(&Data::Empty)))
            .collect())
    }

    fn next_row(&mut self) -> Option<ReaderResult<Vec<Value>>> {
        self.header_row?;
        if self.next >= self.range.height() {
            return None;
        }
        let row = self.row_values(self.next);
        self.next += 1;
        Some(Ok(row))
    }

    fn skip_rows(&mut self, n: usize) -> ReaderResult<usize> {
        if self.header_row.is_none() {
            return Ok(0);
        }
        let skipped = n.min(self.range.height().saturating_sub(self.next));
        self.next += skipped;
        Ok(skipped)
    }
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn convert_cell(c: &Data) -> Value {
    match c {
        Data::Empty => Value::Null,
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::Utf8(s.clone()),
        Data::Int(i) => Value::Int64(*i),
        Data::Float(f) => Value::Float64(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => match c.as_datetime() {
            Some(dt) => Value::DateTime(dt),
            None => Value::Utf8(c.to_string()),
        },
        Data::DurationIso(s) => Value::Utf8(s.clone()),
        Data::Error(e) => {
            log::debug!("spreadsheet cell error {e:?} read as null");
            Value::Null
        }
    }
}

/// Open one sheet of a workbook as a [`Reader`].
pub fn read_excel_from_path(
    path: impl AsRef<Path>,
    sheet: &ExcelSheetSelection,
    options: ReaderOptions,
) -> ReaderResult<Reader<ExcelSource>> {
    let path = path.as_ref();
    let source = ExcelSource::from_path(path, sheet)?;
    let label = format!("{}:{}", path.display(), source.sheet_name());
    Ok(Reader::new(source, options).with_source_label(label))
}
