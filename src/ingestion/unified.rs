//! Unified dispatch entrypoint.
//!
//! Most callers should use [`open_path`], which picks a format adapter for a file and returns a
//! boxed [`Reader`].
//!
//! - If [`OpenOptions::format`] is `None`, the format is inferred from the file extension after
//!   stripping a compression suffix (`data.csv.gz` is CSV).
//! - Unknown extensions fall back to fixed width when [`OpenOptions::fixed_width`] declares
//!   columns, and fail with [`ReaderError::UnsupportedFormat`] otherwise.
//! - If a [`ReaderObserver`](crate::reader::observer::ReaderObserver) is configured, failures to
//!   open are reported to it with the same severity rules as read failures.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::{ReaderError, ReaderResult};
use crate::reader::observer::{ReaderContext, ReaderSeverity};
use crate::reader::{Reader, ReaderOptions, RowSource};

use super::csv::{CsvOptions, CsvSource};
use super::fixed_width::{FixedWidthOptions, FixedWidthSource};
use super::json::{JsonArraySource, JsonOptions};
use super::ndjson::{NdjsonOptions, NdjsonSource};
use super::xml::{XmlOptions, XmlSource};

/// A reader over whichever format [`open_path`] selected.
pub type DynReader = Reader<Box<dyn RowSource>>;

/// Compression suffixes removed before format detection.
pub const COMPRESSION_SUFFIXES: [&str; 5] = ["gz", "gzip", "bz2", "xz", "zip"];

/// Supported file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileFormat {
    /// Comma-separated values.
    Csv,
    /// Tab-separated values.
    Tsv,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
    /// A JSON array of objects.
    Json,
    /// Newline-delimited JSON objects.
    Ndjson,
    /// XML documents.
    Xml,
    /// Fixed-width text with a declared column layout.
    FixedWidth,
}

impl FileFormat {
    /// Every format, in declaration order.
    pub const ALL: [FileFormat; 7] = [
        FileFormat::Csv,
        FileFormat::Tsv,
        FileFormat::Excel,
        FileFormat::Json,
        FileFormat::Ndjson,
        FileFormat::Xml,
        FileFormat::FixedWidth,
    ];

    /// Parse a format from a file extension (case-insensitive).
    ///
    /// Fixed width has no extension of its own and is never returned here.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "tsv" | "tab" => Some(Self::Tsv),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            "json" => Some(Self::Json),
            "ndjson" | "jsonl" => Some(Self::Ndjson),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }

    /// Short lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Excel => "excel",
            Self::Json => "json",
            Self::Ndjson => "ndjson",
            Self::Xml => "xml",
            Self::FixedWidth => "fixed_width",
        }
    }

    /// Cargo feature that must be enabled to read this format, if any.
    pub fn required_feature(self) -> Option<&'static str> {
        match self {
            Self::Excel => Some("excel"),
            _ => None,
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Formats compiled into this build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    formats: Vec<FileFormat>,
}

impl Capabilities {
    /// Returns `true` if `format` can be read by this build.
    pub fn supports(&self, format: FileFormat) -> bool {
        self.formats.contains(&format)
    }

    /// The supported formats.
    pub fn formats(&self) -> &[FileFormat] {
        &self.formats
    }
}

/// Probe which formats this build can read.
pub fn capabilities() -> Capabilities {
    let formats = FileFormat::ALL
        .into_iter()
        .filter(|f| match f {
            FileFormat::Excel => cfg!(feature = "excel"),
            _ => true,
        })
        .collect();
    Capabilities { formats }
}

/// Which sheet of a workbook to read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExcelSheetSelection {
    /// The first sheet (default).
    #[default]
    First,
    /// A sheet by name.
    Named(String),
    /// A sheet by 0-based position.
    Index(usize),
}

/// Options for [`open_path`].
///
/// Use [`Default`] for common cases; only the options of the selected format are used.
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    /// If `None`, detect the format from the file extension.
    pub format: Option<FileFormat>,
    /// Options shared by every reader.
    pub reader: ReaderOptions,
    /// CSV tokenizer options. For `.tsv`/`.tab` files the delimiter is forced to tab.
    pub csv: CsvOptions,
    /// JSON array options.
    pub json: JsonOptions,
    /// NDJSON options.
    pub ndjson: NdjsonOptions,
    /// XML options.
    pub xml: XmlOptions,
    /// Fixed-width layout; also enables the fallback for unrecognized extensions.
    pub fixed_width: FixedWidthOptions,
    /// Workbook sheet selection.
    pub excel_sheet: ExcelSheetSelection,
}

/// Lowercased `(compression suffix, format extension)` of a path.
///
/// `data.csv.gz` gives `(Some("gz"), "csv")`; `data.csv` gives `(None, "csv")`.
pub fn split_extensions(path: &Path) -> (Option<String>, String) {
    let lower_ext = |p: &Path| {
        p.extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default()
    };

    let outer = lower_ext(path);
    if COMPRESSION_SUFFIXES.contains(&outer.as_str()) {
        let inner = path.file_stem().map(Path::new).map(lower_ext).unwrap_or_default();
        (Some(outer), inner)
    } else {
        (None, outer)
    }
}

/// Unified entry point for path-based sources.
///
/// When an observer is configured in `options.reader`, a failure to open is reported through
/// `on_failure` (and `on_alert` at or above `alert_at_or_above`) before being returned.
///
/// # Examples
///
/// ```no_run
/// use rust_data_readers::ingestion::{open_path, OpenOptions};
///
/// # fn main() -> Result<(), rust_data_readers::ReaderError> {
/// // Uses `.csv` to select the CSV adapter; the `.gz` suffix is decoded transparently.
/// let reader = open_path("people.csv.gz", &OpenOptions::default())?;
/// for row in reader {
///     let row = row?;
///     println!("{:?}", row.get("name"));
/// }
/// # Ok(())
/// # }
/// ```
///
/// Force a format explicitly (override extension inference):
///
/// ```no_run
/// use rust_data_readers::ingestion::{open_path, FileFormat, OpenOptions};
///
/// # fn main() -> Result<(), rust_data_readers::ReaderError> {
/// let opts = OpenOptions {
///     format: Some(FileFormat::Ndjson),
///     ..Default::default()
/// };
/// let mut reader = open_path("events.log", &opts)?;
/// println!("{:?}", reader.headers()?);
/// # Ok(())
/// # }
/// ```
pub fn open_path(path: impl AsRef<Path>, options: &OpenOptions) -> ReaderResult<DynReader> {
    let path = path.as_ref();
    let (compression, ext) = split_extensions(path);

    let result = resolve_format(&ext, options).and_then(|format| {
        let source = open_source(path, format, compression.as_deref(), options)?;
        log::info!("opened {} as {format}", path.display());
        Ok(source)
    });

    match result {
        Ok(source) => Ok(Reader::new(source, options.reader.clone()).with_source_label(path.display().to_string())),
        Err(e) => {
            report_open_failure(path, &options.reader, &e);
            Err(e)
        }
    }
}

fn resolve_format(ext: &str, options: &OpenOptions) -> ReaderResult<FileFormat> {
    let format = match options.format {
        Some(f) => f,
        None => match FileFormat::from_extension(ext) {
            Some(f) => f,
            None if !options.fixed_width.columns.is_empty() => FileFormat::FixedWidth,
            None => {
                return Err(ReaderError::UnsupportedFormat {
                    extension: ext.to_string(),
                });
            }
        },
    };

    if !capabilities().supports(format) {
        return Err(ReaderError::FormatNotEnabled {
            format: format.as_str(),
            feature: format.required_feature().unwrap_or("default"),
        });
    }
    Ok(format)
}

fn open_source(
    path: &Path,
    format: FileFormat,
    compression: Option<&str>,
    options: &OpenOptions,
) -> ReaderResult<Box<dyn RowSource>> {
    let gzip = match compression {
        None => false,
        Some("gz" | "gzip") => true,
        Some(other) => {
            return Err(ReaderError::UnsupportedFormat {
                extension: other.to_string(),
            });
        }
    };

    let source: Box<dyn RowSource> = match format {
        FileFormat::Csv => Box::new(CsvSource::from_reader(open_input(path, gzip)?, &options.csv)),
        FileFormat::Tsv => {
            let csv = CsvOptions {
                delimiter: b'\t',
                ..options.csv.clone()
            };
            Box::new(CsvSource::from_reader(open_input(path, gzip)?, &csv))
        }
        FileFormat::Json => Box::new(JsonArraySource::from_reader(
            BufReader::new(open_input(path, gzip)?),
            &options.json,
        )?),
        FileFormat::Ndjson if gzip => {
            // Discovery seeks back after sampling, so a decoded stream is buffered in memory.
            let mut bytes = Vec::new();
            open_input(path, true)?.read_to_end(&mut bytes)?;
            Box::new(NdjsonSource::from_reader(Cursor::new(bytes), &options.ndjson))
        }
        FileFormat::Ndjson => Box::new(NdjsonSource::from_path(path, &options.ndjson)?),
        FileFormat::Xml => Box::new(XmlSource::from_reader(open_input(path, gzip)?, &options.xml)?),
        FileFormat::FixedWidth => Box::new(FixedWidthSource::from_reader(
            BufReader::new(open_input(path, gzip)?),
            &options.fixed_width,
        )?),
        FileFormat::Excel => open_excel(path, gzip, &options.excel_sheet)?,
    };
    Ok(source)
}

fn open_input(path: &Path, gzip: bool) -> ReaderResult<Box<dyn Read>> {
    let file = File::open(path)?;
    if gzip {
        Ok(Box::new(MultiGzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(file))
    }
}

fn open_excel(path: &Path, gzip: bool, sheet: &ExcelSheetSelection) -> ReaderResult<Box<dyn RowSource>> {
    if gzip {
        return Err(ReaderError::UnsupportedFormat {
            extension: "gz".to_string(),
        });
    }

    #[cfg(feature = "excel")]
    {
        Ok(Box::new(super::excel::ExcelSource::from_path(path, sheet)?))
    }

    #[cfg(not(feature = "excel"))]
    {
        let _ = (path, sheet);
        Err(ReaderError::FormatNotEnabled {
            format: FileFormat::Excel.as_str(),
            feature: "excel",
        })
    }
}

fn report_open_failure(path: &Path, options: &ReaderOptions, e: &ReaderError) {
    log::debug!("failed to open {}: {e}", path.display());
    if let Some(obs) = options.observer.as_ref() {
        let ctx = ReaderContext {
            source: path.display().to_string(),
            format: "unknown",
        };
        let sev = ReaderSeverity::for_error(e);
        obs.on_failure(&ctx, sev, e);
        if sev >= options.alert_at_or_above {
            obs.on_alert(&ctx, sev, e);
        }
    }
}
