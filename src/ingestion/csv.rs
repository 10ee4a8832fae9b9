//! CSV / TSV row source.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ByteRecord, StringRecord};

use crate::error::ReaderResult;
use crate::reader::header::synthetic_column_name;
use crate::reader::{Reader, ReaderOptions, RowSource};
use crate::types::Value;

/// Tokenizer options for [`CsvSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    /// Field delimiter (default `,`).
    pub delimiter: u8,
    /// Quote character (default `"`).
    pub quote: u8,
    /// Whether the first row holds column names (default `true`).
    ///
    /// Without a header row, columns are named `column_01`, `column_02`, ... from the width of the
    /// first row, and that row is yielded as data.
    pub has_headers: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            has_headers: true,
        }
    }
}

impl CsvOptions {
    /// Tab-delimited variant of the defaults.
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::default()
        }
    }
}

/// Raw rows from a delimited text stream.
///
/// Rows are allowed to be ragged; cells are [`Value::Utf8`], empty cells are [`Value::Null`].
pub struct CsvSource<R: Read> {
    rdr: csv::Reader<R>,
    has_headers: bool,
    headers_read: bool,
    pending: Option<StringRecord>,
    record: StringRecord,
    skip_buf: ByteRecord,
}

impl CsvSource<File> {
    /// Open a CSV file.
    pub fn from_path(path: impl AsRef<Path>, options: &CsvOptions) -> ReaderResult<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(file, options))
    }
}

impl<R: Read> CsvSource<R> {
    /// Wrap an already-open stream.
    pub fn from_reader(input: R, options: &CsvOptions) -> Self {
        let rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(options.delimiter)
            .quote(options.quote)
            .from_reader(input);
        Self {
            rdr,
            has_headers: options.has_headers,
            headers_read: false,
            pending: None,
            record: StringRecord::new(),
            skip_buf: ByteRecord::new(),
        }
    }

    fn first_record(&mut self) -> ReaderResult<Option<StringRecord>> {
        let mut first = StringRecord::new();
        Ok(self.rdr.read_record(&mut first)?.then_some(first))
    }
}

impl<R: Read> RowSource for CsvSource<R> {
    fn format_name(&self) -> &'static str {
        "csv"
    }

    fn read_headers(&mut self) -> ReaderResult<Vec<String>> {
        self.headers_read = true;
        let Some(first) = self.first_record()? else {
            return Ok(Vec::new());
        };

        if self.has_headers {
            Ok(first.iter().map(str::to_string).collect())
        } else {
            let names = (0..first.len()).map(synthetic_column_name).collect();
            self.pending = Some(first);
            Ok(names)
        }
    }

    fn next_row(&mut self) -> Option<ReaderResult<Vec<Value>>> {
        if !self.headers_read {
            if let Err(e) = self.read_headers() {
                return Some(Err(e));
            }
        }
        if let Some(rec) = self.pending.take() {
            return Some(Ok(record_values(&rec)));
        }
        match self.rdr.read_record(&mut self.record) {
            Ok(true) => Some(Ok(record_values(&self.record))),
            Ok(false) => None,
            Err(e) => Some(Err(e.into())),
        }
    }

    fn skip_rows(&mut self, n: usize) -> ReaderResult<usize> {
        if !self.headers_read {
            self.read_headers()?;
        }
        let mut skipped = 0;
        if n > 0 && self.pending.take().is_some() {
            skipped += 1;
        }
        // Byte records skip UTF-8 validation and per-field allocation.
        while skipped < n && self.rdr.read_byte_record(&mut self.skip_buf)? {
            skipped += 1;
        }
        Ok(skipped)
    }
}

fn record_values(rec: &StringRecord) -> Vec<Value> {
    rec.iter()
        .map(|cell| {
            if cell.is_empty() {
                Value::Null
            } else {
                Value::Utf8(cell.to_string())
            }
        })
        .collect()
}

/// Open a CSV file as a [`Reader`].
pub fn read_csv_from_path(
    path: impl AsRef<Path>,
    csv_options: &CsvOptions,
    options: ReaderOptions,
) -> ReaderResult<Reader<CsvSource<File>>> {
    let path = path.as_ref();
    let source = CsvSource::from_path(path, csv_options)?;
    Ok(Reader::new(source, options).with_source_label(path.display().to_string()))
}

/// Build a [`Reader`] over an open CSV stream.
pub fn read_csv_from_reader<R: Read>(
    input: R,
    csv_options: &CsvOptions,
    options: ReaderOptions,
) -> Reader<CsvSource<R>> {
    Reader::new(CsvSource::from_reader(input, csv_options), options)
}
