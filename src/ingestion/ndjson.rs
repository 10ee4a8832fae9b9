//! Newline-delimited JSON row source.
//!
//! Schema discovery samples up to [`NdjsonOptions::sample_size`] well-formed lines, collecting
//! object keys in first-seen order, then seeks the stream back to where sampling started.
//! Blank, malformed, and non-object lines are skipped silently, both while sampling and while
//! reading rows.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use indexmap::IndexSet;
use serde_json::{Map, Value as JsonValue};

use super::json::{flatten_object, project};
use crate::error::{ReaderError, ReaderResult};
use crate::reader::{Reader, ReaderOptions, RowSource};
use crate::types::Value;

/// Default number of well-formed lines examined during schema discovery.
pub const DEFAULT_NDJSON_SAMPLE_SIZE: usize = 100;

/// Options for NDJSON streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdjsonOptions {
    /// Maximum number of well-formed lines sampled for keys.
    pub sample_size: usize,
    /// Merge nested objects into the parent namespace with `.`-joined keys.
    pub flatten: bool,
}

impl Default for NdjsonOptions {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_NDJSON_SAMPLE_SIZE,
            flatten: false,
        }
    }
}

enum Line {
    Object(Map<String, JsonValue>),
    Other,
    Malformed(serde_json::Error),
    Blank,
}

/// Raw rows from a seekable NDJSON stream.
pub struct NdjsonSource<R: BufRead + Seek> {
    input: R,
    options: NdjsonOptions,
    keys: Vec<String>,
    buf: Vec<u8>,
    line_no: usize,
    skipped_lines: usize,
}

impl NdjsonSource<BufReader<File>> {
    /// Open an NDJSON file.
    pub fn from_path(path: impl AsRef<Path>, options: &NdjsonOptions) -> ReaderResult<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file), options))
    }
}

impl<R: BufRead + Seek> NdjsonSource<R> {
    /// Wrap an already-open, seekable stream. Reading starts at its current position.
    pub fn from_reader(input: R, options: &NdjsonOptions) -> Self {
        Self {
            input,
            options: options.clone(),
            keys: Vec::new(),
            buf: Vec::new(),
            line_no: 0,
            skipped_lines: 0,
        }
    }

    /// Lines skipped so far while reading rows (blank, malformed, or not an object).
    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    /// Current position of the underlying stream.
    pub fn position(&mut self) -> ReaderResult<u64> {
        Ok(self.input.stream_position()?)
    }

    fn read_line(&mut self) -> ReaderResult<Option<Line>> {
        self.buf.clear();
        if self.input.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        let text = self.buf.trim_ascii();
        if text.is_empty() {
            return Ok(Some(Line::Blank));
        }
        Ok(Some(match serde_json::from_slice::<JsonValue>(text) {
            Ok(JsonValue::Object(obj)) if self.options.flatten => Line::Object(flatten_object(&obj)),
            Ok(JsonValue::Object(obj)) => Line::Object(obj),
            Ok(_) => Line::Other,
            Err(e) => Line::Malformed(e),
        }))
    }
}

impl<R: BufRead + Seek> RowSource for NdjsonSource<R> {
    fn format_name(&self) -> &'static str {
        "ndjson"
    }

    fn read_headers(&mut self) -> ReaderResult<Vec<String>> {
        let start = self.input.stream_position()?;
        let mut keys: IndexSet<String> = IndexSet::new();
        let mut well_formed = 0;

        while well_formed < self.options.sample_size {
            match self.read_line()? {
                None => break,
                Some(Line::Object(obj)) => {
                    well_formed += 1;
                    keys.extend(obj.into_iter().map(|(k, _)| k));
                }
                Some(Line::Other) => well_formed += 1,
                Some(Line::Malformed(e)) => log::debug!("ndjson sampling skipped malformed line: {e}"),
                Some(Line::Blank) => {}
            }
        }
        self.input.seek(SeekFrom::Start(start))?;

        if keys.is_empty() {
            return Err(ReaderError::NoKeys {
                message: format!(
                    "no json object found in the first {} lines of the ndjson stream",
                    self.options.sample_size
                ),
            });
        }
        self.keys = keys.into_iter().collect();
        Ok(self.keys.clone())
    }

    fn next_row(&mut self) -> Option<ReaderResult<Vec<Value>>> {
        loop {
            let line = match self.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            };
            self.line_no += 1;
            match line {
                Line::Object(obj) => return Some(Ok(project(&obj, &self.keys))),
                Line::Malformed(e) => {
                    self.skipped_lines += 1;
                    log::debug!("ndjson line {} skipped: {e}", self.line_no);
                }
                Line::Other => {
                    self.skipped_lines += 1;
                    log::debug!("ndjson line {} skipped: not an object", self.line_no);
                }
                Line::Blank => {}
            }
        }
    }
}

/// Open an NDJSON file as a [`Reader`].
pub fn read_ndjson_from_path(
    path: impl AsRef<Path>,
    ndjson_options: &NdjsonOptions,
    options: ReaderOptions,
) -> ReaderResult<Reader<NdjsonSource<BufReader<File>>>> {
    let path = path.as_ref();
    let source = NdjsonSource::from_path(path, ndjson_options)?;
    Ok(Reader::new(source, options).with_source_label(path.display().to_string()))
}

/// Build a [`Reader`] over an open, seekable NDJSON stream.
pub fn read_ndjson_from_reader<R: BufRead + Seek>(
    input: R,
    ndjson_options: &NdjsonOptions,
    options: ReaderOptions,
) -> Reader<NdjsonSource<R>> {
    Reader::new(NdjsonSource::from_reader(input, ndjson_options), options)
}
