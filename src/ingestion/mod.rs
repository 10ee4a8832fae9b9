//! Format adapters and the dispatch entrypoint.
//!
//! Most callers should use [`open_path`] (from [`unified`]) which:
//!
//! - auto-detects format by file extension (or you can override via [`OpenOptions`])
//! - decodes gzip-compressed inputs
//! - returns a [`DynReader`] that yields records through the shared reader core
//!
//! Format-specific sources and `read_*` helpers are also available under:
//! - [`csv`]
//! - [`json`]
//! - [`ndjson`]
//! - [`xml`]
//! - [`fixed_width`]
//! - `excel` (feature `excel`)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod fixed_width;
pub mod json;
pub mod ndjson;
pub mod unified;
pub mod xml;

pub use csv::{read_csv_from_path, read_csv_from_reader, CsvOptions, CsvSource};
#[cfg(feature = "excel")]
pub use excel::{read_excel_from_path, ExcelSource};
pub use fixed_width::{
    infer_columns, infer_columns_from_lines, read_fixed_width_from_path, read_fixed_width_from_reader, FieldType,
    FixedWidthColumn, FixedWidthOptions, FixedWidthSource, InferOptions,
};
pub use json::{read_json_from_path, read_json_from_str, JsonArraySource, JsonOptions};
pub use ndjson::{read_ndjson_from_path, read_ndjson_from_reader, NdjsonOptions, NdjsonSource};
pub use unified::{capabilities, open_path, Capabilities, DynReader, ExcelSheetSelection, FileFormat, OpenOptions};
pub use xml::{read_xml_from_path, read_xml_from_str, XmlColumn, XmlOptions, XmlPath, XmlSource};
