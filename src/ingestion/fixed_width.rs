//! Fixed-width text row source, plus column-boundary inference.
//!
//! Columns are declared up front as 1-based inclusive character spans with a type tag. Each
//! sliced field is coerced to its declared type; a field that does not parse falls back to its
//! text instead of failing the row.
//!
//! [`infer_columns`] is an authoring aid for files without a layout: it looks for
//! whitespace-delimited token spans that recur at the same offsets and guesses a type for each.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ReaderError, ReaderResult};
use crate::reader::header::synthetic_column_name;
use crate::reader::{Reader, ReaderOptions, RowSource};
use crate::types::Value;

/// Minimum number of times a span must recur before [`infer_columns`] keeps it.
pub const DEFAULT_MIN_OCCURRENCES: usize = 5;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%m/%d/%Y", "%d-%b-%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

static INT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+$").expect("valid int regex"));
static FLOAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+\.\d*|\.\d+|\d+)([eE][+-]?\d+)?$").expect("valid float regex")
});

/// Declared type of a fixed-width column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Keep the text.
    #[default]
    Text,
    /// 64-bit integer.
    Int,
    /// 64-bit float.
    Float,
    /// Calendar date.
    Date,
    /// Date and time.
    DateTime,
    /// Unix seconds, or a date-time string.
    Timestamp,
}

impl FieldType {
    /// Canonical tag.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = ReaderError;

    fn from_str(s: &str) -> ReaderResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "str" | "string" => Ok(FieldType::Text),
            "int" | "integer" => Ok(FieldType::Int),
            "float" | "double" | "decimal" => Ok(FieldType::Float),
            "date" => Ok(FieldType::Date),
            "datetime" => Ok(FieldType::DateTime),
            "timestamp" => Ok(FieldType::Timestamp),
            other => Err(ReaderError::InvalidColumnSpec {
                message: format!("unknown column type '{other}'"),
            }),
        }
    }
}

/// One fixed-width column: a 1-based inclusive character span.
///
/// Layouts can be kept as JSON: `{"name": "id", "start": 1, "end": 4, "type": "int"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedWidthColumn {
    /// Column name.
    pub name: String,
    /// First character, 1-based.
    pub start: usize,
    /// Last character, 1-based, inclusive.
    pub end: usize,
    /// Type the field is coerced to.
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
}

impl FixedWidthColumn {
    /// Create a column definition.
    pub fn new(name: impl Into<String>, start: usize, end: usize, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            start,
            end,
            field_type,
        }
    }

    /// Width in characters.
    pub fn width(&self) -> usize {
        (self.end + 1).saturating_sub(self.start)
    }

    fn validate(&self) -> ReaderResult<()> {
        let message = if self.name.trim().is_empty() {
            "column name is empty".to_string()
        } else if self.start == 0 {
            format!("column '{}': start is 1-based, got 0", self.name)
        } else if self.end < self.start {
            format!(
                "column '{}': end {} is before start {}",
                self.name, self.end, self.start
            )
        } else {
            return Ok(());
        };
        Err(ReaderError::InvalidColumnSpec { message })
    }
}

/// Options for fixed-width files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedWidthOptions {
    /// Column layout.
    pub columns: Vec<FixedWidthColumn>,
    /// Trim surrounding whitespace from text fields (default `true`).
    pub trim: bool,
}

impl Default for FixedWidthOptions {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            trim: true,
        }
    }
}

impl FixedWidthOptions {
    /// Layout with default trimming.
    pub fn new(columns: Vec<FixedWidthColumn>) -> Self {
        Self {
            columns,
            ..Self::default()
        }
    }
}

/// Raw rows from a fixed-width text stream.
pub struct FixedWidthSource<R: BufRead> {
    input: R,
    columns: Vec<FixedWidthColumn>,
    trim: bool,
    line: String,
    skip_buf: Vec<u8>,
}

impl FixedWidthSource<BufReader<File>> {
    /// Open a fixed-width file.
    pub fn from_path(path: impl AsRef<Path>, options: &FixedWidthOptions) -> ReaderResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), options)
    }
}

impl<R: BufRead> FixedWidthSource<R> {
    /// Wrap an open stream. Fails if the layout is empty or any column is invalid.
    pub fn from_reader(input: R, options: &FixedWidthOptions) -> ReaderResult<Self> {
        if options.columns.is_empty() {
            return Err(ReaderError::InvalidColumnSpec {
                message: "no columns defined".to_string(),
            });
        }
        for col in &options.columns {
            col.validate()?;
        }
        Ok(Self {
            input,
            columns: options.columns.clone(),
            trim: options.trim,
            line: String::new(),
            skip_buf: Vec::new(),
        })
    }

    /// Column layout.
    pub fn columns(&self) -> &[FixedWidthColumn] {
        &self.columns
    }
}

impl<R: BufRead> RowSource for FixedWidthSource<R> {
    fn format_name(&self) -> &'static str {
        "fixed_width"
    }

    fn read_headers(&mut self) -> ReaderResult<Vec<String>> {
        Ok(self.columns.iter().map(|c| c.name.clone()).collect())
    }

    fn next_row(&mut self) -> Option<ReaderResult<Vec<Value>>> {
        self.line.clear();
        match self.input.read_line(&mut self.line) {
            Ok(0) => return None,
            Ok(_) => {}
            Err(e) => return Some(Err(e.into())),
        }
        let line = self.line.trim_end_matches(['\n', '\r']);
        let row = self
            .columns
            .iter()
            .map(|col| match slice_chars(line, col.start - 1, col.end) {
                Some(raw) => coerce(raw, col.field_type, self.trim),
                None => Value::Null,
            })
            .collect();
        Some(Ok(row))
    }

    fn skip_rows(&mut self, n: usize) -> ReaderResult<usize> {
        let mut skipped = 0;
        while skipped < n {
            self.skip_buf.clear();
            if self.input.read_until(b'\n', &mut self.skip_buf)? == 0 {
                break;
            }
            skipped += 1;
        }
        Ok(skipped)
    }
}

/// Characters `[from, to)` of `line`, clipped to its length; `None` when nothing remains.
fn slice_chars(line: &str, from: usize, to: usize) -> Option<&str> {
    if line.is_ascii() {
        return (from < line.len()).then(|| &line[from..to.min(line.len())]);
    }
    let mut bounds = line.char_indices().map(|(i, _)| i).chain(std::iter::once(line.len()));
    let start = bounds.nth(from)?;
    if start == line.len() {
        return None;
    }
    let end = bounds.nth(to - from - 1).unwrap_or(line.len());
    Some(&line[start..end])
}

/// Coerce one sliced field; unparsable values fall back to text.
pub fn coerce(raw: &str, field_type: FieldType, trim: bool) -> Value {
    let t = raw.trim();
    if t.is_empty() {
        return Value::Null;
    }
    let parsed = match field_type {
        FieldType::Text => None,
        FieldType::Int => t.parse::<i64>().ok().map(Value::Int64),
        FieldType::Float => t.parse::<f64>().ok().map(Value::Float64),
        FieldType::Date => parse_date(t).map(Value::Date),
        FieldType::DateTime => parse_datetime(t).map(Value::DateTime),
        FieldType::Timestamp => t
            .parse::<i64>()
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.naive_utc())
            .or_else(|| parse_datetime(t))
            .map(Value::DateTime),
    };
    parsed.unwrap_or_else(|| Value::Utf8(if trim { t } else { raw }.to_string()))
}

/// Parse a date in one of the supported layouts.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Parse a date-time in one of the supported layouts; a bare date means midnight.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

/// Options for [`infer_columns`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferOptions {
    /// Spans seen fewer times than this are ignored.
    pub min_occurrences: usize,
}

impl Default for InferOptions {
    fn default() -> Self {
        Self {
            min_occurrences: DEFAULT_MIN_OCCURRENCES,
        }
    }
}

// Vote slots, ordered from most specific to most general; ties go to the later slot.
const VOTE_TYPES: [FieldType; 4] = [FieldType::Int, FieldType::Float, FieldType::Date, FieldType::Text];

#[derive(Debug, Default)]
struct SpanStats {
    count: usize,
    votes: [usize; 4],
}

fn classify(token: &str) -> usize {
    if INT_RE.is_match(token) {
        0
    } else if FLOAT_RE.is_match(token) {
        1
    } else if parse_date(token).is_some() {
        2
    } else {
        3
    }
}

/// Infer a column layout from the lines of a stream.
pub fn infer_columns<R: BufRead>(input: R, options: &InferOptions) -> ReaderResult<Vec<FixedWidthColumn>> {
    let lines = input.lines().collect::<Result<Vec<_>, _>>()?;
    Ok(infer_columns_from_lines(&lines, options))
}

/// Infer a column layout from text lines.
///
/// Every whitespace-delimited token is recorded by its exact character span. Spans seen at least
/// `min_occurrences` times become columns. Walking spans in first-seen order, a span that
/// overlaps an already accepted one is cut to end where the earlier one starts, or dropped if it
/// starts inside it. Column types are the majority vote of token shapes (int, float, date, text).
pub fn infer_columns_from_lines<S: AsRef<str>>(lines: &[S], options: &InferOptions) -> Vec<FixedWidthColumn> {
    let mut spans: IndexMap<(usize, usize), SpanStats> = IndexMap::new();

    for line in lines {
        let line = line.as_ref().trim_end_matches(['\n', '\r']);
        let mut token_start: Option<(usize, usize)> = None;
        for (pos, (byte_idx, ch)) in line.char_indices().enumerate() {
            match (ch.is_whitespace(), token_start) {
                (false, None) => token_start = Some((pos, byte_idx)),
                (true, Some((start, start_byte))) => {
                    record_token(&mut spans, start, pos, &line[start_byte..byte_idx]);
                    token_start = None;
                }
                _ => {}
            }
        }
        if let Some((start, start_byte)) = token_start {
            let end = line.chars().count();
            record_token(&mut spans, start, end, &line[start_byte..]);
        }
    }

    let mut kept: Vec<(usize, usize, [usize; 4])> = Vec::new();
    for ((start, end), stats) in spans {
        if stats.count < options.min_occurrences {
            continue;
        }
        let mut end = end;
        let mut dropped = false;
        for &(k_start, k_end, _) in &kept {
            if start < k_end && k_start < end {
                if start < k_start {
                    end = k_start;
                } else {
                    dropped = true;
                    break;
                }
            }
        }
        if !dropped && start < end {
            kept.push((start, end, stats.votes));
        }
    }
    kept.sort_by_key(|&(start, _, _)| start);

    log::debug!("fixed-width inference kept {} spans", kept.len());
    kept.into_iter()
        .enumerate()
        .map(|(i, (start, end, votes))| {
            FixedWidthColumn::new(synthetic_column_name(i), start + 1, end, majority_type(&votes))
        })
        .collect()
}

fn record_token(spans: &mut IndexMap<(usize, usize), SpanStats>, start: usize, end: usize, token: &str) {
    let stats = spans.entry((start, end)).or_default();
    stats.count += 1;
    stats.votes[classify(token)] += 1;
}

fn majority_type(votes: &[usize; 4]) -> FieldType {
    let mut best = 0;
    for (i, &v) in votes.iter().enumerate() {
        if v >= votes[best] {
            best = i;
        }
    }
    VOTE_TYPES[best]
}

/// Open a fixed-width file as a [`Reader`].
pub fn read_fixed_width_from_path(
    path: impl AsRef<Path>,
    fw_options: &FixedWidthOptions,
    options: ReaderOptions,
) -> ReaderResult<Reader<FixedWidthSource<BufReader<File>>>> {
    let path = path.as_ref();
    let source = FixedWidthSource::from_path(path, fw_options)?;
    Ok(Reader::new(source, options).with_source_label(path.display().to_string()))
}

/// Build a [`Reader`] over an open fixed-width stream.
pub fn read_fixed_width_from_reader<R: BufRead>(
    input: R,
    fw_options: &FixedWidthOptions,
    options: ReaderOptions,
) -> ReaderResult<Reader<FixedWidthSource<R>>> {
    Ok(Reader::new(FixedWidthSource::from_reader(input, fw_options)?, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_falls_back_to_text() {
        assert_eq!(coerce(" 42 ", FieldType::Int, true), Value::Int64(42));
        assert_eq!(coerce(" 4x2 ", FieldType::Int, true), Value::from("4x2"));
        assert_eq!(coerce(" 4x2 ", FieldType::Int, false), Value::from(" 4x2 "));
        assert_eq!(coerce("1.5", FieldType::Float, true), Value::Float64(1.5));
        assert_eq!(coerce("   ", FieldType::Text, true), Value::Null);
        assert_eq!(
            coerce("2024-02-30", FieldType::Date, true),
            Value::from("2024-02-30")
        );
    }

    #[test]
    fn coerce_dates_and_timestamps() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(coerce("20240115", FieldType::Date, true), Value::Date(d));
        assert_eq!(coerce("01/15/2024", FieldType::Date, true), Value::Date(d));
        let dt = d.and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(coerce("2024-01-15 10:30:00", FieldType::DateTime, true), Value::DateTime(dt));
        assert_eq!(coerce("2024-01-15T10:30:00", FieldType::Timestamp, true), Value::DateTime(dt));
        assert_eq!(
            coerce("0", FieldType::Timestamp, true),
            Value::DateTime(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())
        );
    }

    #[test]
    fn slices_by_character() {
        assert_eq!(slice_chars("abcdef", 1, 3), Some("bc"));
        assert_eq!(slice_chars("abc", 1, 10), Some("bc"));
        assert_eq!(slice_chars("abc", 3, 5), None);
        assert_eq!(slice_chars("héllo wörld", 6, 11), Some("wörld"));
        assert_eq!(slice_chars("héllo", 1, 3), Some("él"));
        assert_eq!(slice_chars("hé", 2, 4), None);
    }

    #[test]
    fn invalid_layouts_are_rejected() {
        let bad = [
            FixedWidthColumn::new("a", 0, 3, FieldType::Text),
            FixedWidthColumn::new("a", 4, 3, FieldType::Text),
            FixedWidthColumn::new(" ", 1, 3, FieldType::Text),
        ];
        for col in bad {
            let opts = FixedWidthOptions::new(vec![col]);
            let err = FixedWidthSource::from_reader(&b""[..], &opts).err().unwrap();
            assert!(matches!(err, ReaderError::InvalidColumnSpec { .. }));
        }
        assert!("money".parse::<FieldType>().is_err());
        assert_eq!("Integer".parse::<FieldType>().unwrap(), FieldType::Int);
    }

    #[test]
    fn layout_loads_from_json() {
        let cols: Vec<FixedWidthColumn> = serde_json::from_str(
            r#"[{"name":"id","start":1,"end":4,"type":"int"},{"name":"note","start":5,"end":20}]"#,
        )
        .unwrap();
        assert_eq!(cols[0], FixedWidthColumn::new("id", 1, 4, FieldType::Int));
        assert_eq!(cols[1].field_type, FieldType::Text);
        assert_eq!(cols[1].width(), 16);
    }

    #[test]
    fn inference_finds_recurring_spans_and_types() {
        let lines: Vec<String> = (1..=6)
            .map(|i| format!("{i:03}  name{i}  {}.5  2024-01-0{i}", i * 10))
            .collect();
        let cols = infer_columns_from_lines(&lines, &InferOptions::default());
        let summary: Vec<(&str, usize, usize, FieldType)> = cols
            .iter()
            .map(|c| (c.name.as_str(), c.start, c.end, c.field_type))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("column_01", 1, 3, FieldType::Int),
                ("column_02", 6, 10, FieldType::Text),
                ("column_03", 13, 16, FieldType::Float),
                ("column_04", 19, 28, FieldType::Date),
            ]
        );
    }

    #[test]
    fn inference_ignores_rare_spans() {
        let mut lines = vec!["aa bb".to_string(); 5];
        lines.push("aa bb   rare".to_string());
        let cols = infer_columns_from_lines(&lines, &InferOptions::default());
        assert_eq!(cols.len(), 2);
        assert_eq!((cols[1].start, cols[1].end), (4, 5));
    }

    #[test]
    fn inference_clips_overlapping_spans() {
        let mut lines = vec!["    abcd".to_string(); 5];
        lines.extend(vec!["ab xxxxxx".to_string(); 5]);
        lines.extend(vec!["     zz".to_string(); 5]);
        let opts = InferOptions { min_occurrences: 5 };
        let cols = infer_columns_from_lines(&lines, &opts);
        let spans: Vec<(usize, usize)> = cols.iter().map(|c| (c.start, c.end)).collect();
        // "xxxxxx" (3..9) is cut where "abcd" (4..8) starts; "zz" starts inside "abcd" and is dropped.
        assert_eq!(spans, vec![(1, 2), (4, 4), (5, 8)]);
    }
}
