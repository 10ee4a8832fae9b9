//! `rust-data-readers` exposes CSV, Excel, JSON, NDJSON, XML and fixed-width files through one
//! record-reading contract.
//!
//! Every format is a [`reader::RowSource`] (raw header discovery plus a lazy row sequence).
//! [`reader::Reader`] wraps a source and owns everything format-independent:
//!
//! - header cleaning ([`reader::header::CleanLevel`], default `LowerNoSpace`)
//! - skip/limit pagination (`skip_records`, `max_records`)
//! - an appended row-number column (`rownum`, counted from the skip offset)
//! - output as a [`reader::record::Record`] or an ordered map ([`reader::record::RowMap`])
//!
//! The primary entrypoint is [`ingestion::open_path`], which auto-detects the format from the file
//! extension (stripping `.gz` and friends first), or you can force a format via
//! [`ingestion::OpenOptions`].
//!
//! ## What you can read
//!
//! - **CSV / TSV**: `.csv`, `.tsv`, `.tab`
//! - **JSON**: `.json` (array of objects; columns are the sorted union of keys)
//! - **NDJSON**: `.ndjson`, `.jsonl` (columns sampled from the first lines, in first-seen order)
//! - **XML**: `.xml` (records selected by a path; columns explicit and/or inferred from child tags)
//! - **Fixed width**: any extension, given a column layout ([`ingestion::infer_columns`] can draft
//!   one)
//! - **Excel/workbooks** (requires the Cargo feature `excel`): `.xlsx`, `.xls`, `.xlsm`, `.xlsb`,
//!   `.ods`
//!
//! Cells are untyped [`types::Value`]s. Empty cells and JSON `null` map to [`types::Value::Null`];
//! fixed-width columns are coerced to their declared type.
//!
//! ## Quick example
//!
//! ```no_run
//! use rust_data_readers::ingestion::{open_path, OpenOptions};
//! use rust_data_readers::reader::ReaderOptions;
//!
//! # fn main() -> Result<(), rust_data_readers::ReaderError> {
//! let opts = OpenOptions {
//!     reader: ReaderOptions {
//!         skip_records: 10,
//!         max_records: Some(10),
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! let mut reader = open_path("people.csv", &opts)?;
//! println!("columns={:?}", reader.headers()?);
//! for record in reader {
//!     let record = record?;
//!     println!("{:?} {:?}", record.get("rownum"), record.get("name"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Any [`std::io::Read`] works too, without going through the filesystem:
//!
//! ```rust
//! use rust_data_readers::ingestion::{read_csv_from_reader, CsvOptions};
//! use rust_data_readers::reader::ReaderOptions;
//! use rust_data_readers::types::Value;
//!
//! let data = "Term Code,Full Name\n201910,Ada\n201920,Grace\n";
//! let mut reader = read_csv_from_reader(data.as_bytes(), &CsvOptions::default(), ReaderOptions::default());
//! assert_eq!(reader.headers().unwrap(), vec!["term_code", "full_name", "rownum"]);
//!
//! let first = reader.next().unwrap().unwrap();
//! assert_eq!(first.get("full_name"), Some(&Value::from("Ada")));
//! assert_eq!(first.get("rownum"), Some(&Value::Int64(1)));
//! ```
//!
//! ## Modules
//!
//! - [`reader`]: the format-independent core (header cleaning, pagination, records, observers)
//! - [`ingestion`]: format adapters and the dispatch entrypoint
//! - [`types`]: the cell value type
//! - [`error`]: error types used across readers

pub mod error;
pub mod ingestion;
pub mod reader;
pub mod types;

pub use error::{ErrorCategory, ReaderError, ReaderResult};
