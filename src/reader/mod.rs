//! The format-independent reader core.
//!
//! A format adapter implements [`RowSource`] (raw header tokens + a lazy sequence of raw rows).
//! [`Reader`] composes a source with header cleaning ([`header`]), skip/limit
//! ([`pagination`]), row numbering and record materialization ([`record`]) into one iteration
//! contract. Adapters own no normalization logic.
//!
//! Lifecycle:
//!
//! - construction does not touch the source
//! - the first call to [`Reader::headers`] or [`Reader::next_record`] runs schema discovery
//!   (`RowSource::read_headers`) exactly once and caches the canonical headers; if discovery
//!   fails the error is returned once, iteration ends, and later header requests report
//!   [`ReaderError::SchemaUnavailable`]
//! - every later pull goes through the pagination window and is materialized
//! - [`Reader::close`] (or dropping the reader) releases the source

pub mod header;
pub mod observer;
pub mod pagination;
pub mod record;

use std::fmt;
use std::sync::Arc;

use crate::error::{ErrorCategory, ReaderError, ReaderResult};
use crate::types::Value;

use header::canonical_headers;
use pagination::PaginationWindow;
use record::{materialize, RecordLayout};

pub use header::CleanLevel;
pub use observer::{
    CompositeObserver, FileObserver, LogObserver, ReaderContext, ReaderObserver, ReaderSeverity, ReaderStats,
    StdErrObserver,
};
pub use record::{Record, ReturnType, Row, RowMap};

/// Default name of the synthetic row-number column.
pub const DEFAULT_ROWNUM_FIELD: &str = "rownum";

/// A format adapter: raw header discovery plus a forward-only row sequence.
pub trait RowSource {
    /// Short format name used in logs and observer callbacks.
    fn format_name(&self) -> &'static str {
        "custom"
    }

    /// Discover or declare the raw (uncleaned) column names.
    ///
    /// Called at most once per reader, before the first row is pulled.
    fn read_headers(&mut self) -> ReaderResult<Vec<String>>;

    /// Produce the next raw row, or `None` when the source is exhausted.
    ///
    /// Rows may be shorter or longer than the header list.
    fn next_row(&mut self) -> Option<ReaderResult<Vec<Value>>>;

    /// Pass over up to `n` rows, returning how many were actually skipped.
    ///
    /// The default pulls and discards rows; formats override this when they can skip without
    /// decoding content.
    fn skip_rows(&mut self, n: usize) -> ReaderResult<usize> {
        let mut skipped = 0;
        while skipped < n {
            match self.next_row() {
                Some(Ok(_)) => skipped += 1,
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }
        Ok(skipped)
    }
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    fn format_name(&self) -> &'static str {
        (**self).format_name()
    }

    fn read_headers(&mut self) -> ReaderResult<Vec<String>> {
        (**self).read_headers()
    }

    fn next_row(&mut self) -> Option<ReaderResult<Vec<Value>>> {
        (**self).next_row()
    }

    fn skip_rows(&mut self, n: usize) -> ReaderResult<usize> {
        (**self).skip_rows(n)
    }
}

/// Options shared by every reader.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct ReaderOptions {
    /// Append a row-number column (default `true`).
    pub add_rownum: bool,
    /// Name of the row-number column.
    pub rownum_field: String,
    /// Header-normalization level.
    pub clean_headers: CleanLevel,
    /// Records to skip after header resolution.
    pub skip_records: usize,
    /// Cap on records returned; `None` means unlimited.
    pub max_records: Option<usize>,
    /// Output shape.
    pub return_type: ReturnType,
    /// Optional observer for lifecycle events.
    pub observer: Option<Arc<dyn ReaderObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: ReaderSeverity,
}

impl fmt::Debug for ReaderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderOptions")
            .field("add_rownum", &self.add_rownum)
            .field("rownum_field", &self.rownum_field)
            .field("clean_headers", &self.clean_headers)
            .field("skip_records", &self.skip_records)
            .field("max_records", &self.max_records)
            .field("return_type", &self.return_type)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            add_rownum: true,
            rownum_field: DEFAULT_ROWNUM_FIELD.to_string(),
            clean_headers: CleanLevel::default(),
            skip_records: 0,
            max_records: None,
            return_type: ReturnType::default(),
            observer: None,
            alert_at_or_above: ReaderSeverity::Critical,
        }
    }
}

#[derive(Debug)]
enum State {
    Uninitialized,
    Ready {
        layout: Arc<RecordLayout>,
        numbered: bool,
    },
    // Discovery ran and failed; the source is not asked again.
    Failed {
        message: String,
        category: ErrorCategory,
    },
}

/// Uniform record reader over any [`RowSource`].
///
/// Iterating yields `ReaderResult<Row>`; the iterator ends when the source is exhausted, the
/// `max_records` cap is reached, or the reader is closed.
pub struct Reader<S: RowSource> {
    source: Option<S>,
    options: ReaderOptions,
    ctx: ReaderContext,
    state: State,
    window: Option<PaginationWindow>,
    record_num: usize,
    exhausted: bool,
}

impl<S: RowSource> fmt::Debug for Reader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reader")
            .field("format", &self.ctx.format)
            .field("source", &self.ctx.source)
            .field("options", &self.options)
            .field("state", &self.state)
            .field("record_num", &self.record_num)
            .field("closed", &self.source.is_none())
            .finish()
    }
}

impl<S: RowSource> Reader<S> {
    /// Wrap a row source. Nothing is read until headers or rows are requested.
    pub fn new(source: S, options: ReaderOptions) -> Self {
        let ctx = ReaderContext {
            source: "<stream>".to_string(),
            format: source.format_name(),
        };
        Self {
            source: Some(source),
            options,
            ctx,
            state: State::Uninitialized,
            window: None,
            record_num: 0,
            exhausted: false,
        }
    }

    /// Set the input description reported to observers.
    pub fn with_source_label(mut self, label: impl Into<String>) -> Self {
        self.ctx.source = label.into();
        self
    }

    /// Reader options.
    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// The underlying row source, unless the reader was closed.
    pub fn source(&self) -> Option<&S> {
        self.source.as_ref()
    }

    /// Number of records yielded so far (1 after the first record).
    pub fn record_num(&self) -> usize {
        self.record_num
    }

    /// Returns `true` once [`Self::close`] ran.
    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    /// Canonical headers, running schema discovery on first use.
    ///
    /// Returns a copy; the cached list is never modified after discovery.
    pub fn headers(&mut self) -> ReaderResult<Vec<String>> {
        let (layout, _) = self.ensure_schema()?;
        Ok(layout.names().to_vec())
    }

    /// Pull the next materialized record.
    ///
    /// Returns `None` at end of data (not an error). A discovery error is returned once and ends
    /// the iteration; row errors are returned once per occurrence and iteration may continue.
    pub fn next_record(&mut self) -> Option<ReaderResult<Row>> {
        self.source.as_ref()?;
        if matches!(self.state, State::Failed { .. }) {
            return None;
        }
        let (layout, numbered) = match self.ensure_schema() {
            Ok(ready) => ready,
            Err(e) => return Some(Err(e)),
        };

        let options = &self.options;
        let window = self
            .window
            .get_or_insert_with(|| PaginationWindow::new(options.skip_records, options.max_records));
        let source = self.source.as_mut()?;

        match window.pull(source) {
            Some(Ok(raw)) => {
                self.record_num += 1;
                let rownum = numbered.then(|| (self.options.skip_records + self.record_num) as i64);
                Some(Ok(materialize(&layout, &raw, rownum, self.options.return_type)))
            }
            Some(Err(e)) => {
                self.report_failure(&e);
                Some(Err(e))
            }
            None => {
                if !self.exhausted {
                    self.exhausted = true;
                    if let Some(obs) = self.options.observer.as_ref() {
                        obs.on_exhausted(&self.ctx, ReaderStats { records: self.record_num });
                    }
                }
                None
            }
        }
    }

    /// Release the underlying source. Later pulls return `None`.
    ///
    /// Safe to call more than once; dropping the reader has the same effect.
    pub fn close(&mut self) {
        if self.source.take().is_some() {
            log::debug!("closed {} reader for {}", self.ctx.format, self.ctx.source);
        }
    }

    fn ensure_schema(&mut self) -> ReaderResult<(Arc<RecordLayout>, bool)> {
        match &self.state {
            State::Ready { layout, numbered } => return Ok((Arc::clone(layout), *numbered)),
            State::Failed { message, category } => {
                return Err(ReaderError::SchemaUnavailable {
                    message: message.clone(),
                    category: *category,
                });
            }
            State::Uninitialized => {}
        }

        let Some(source) = self.source.as_mut() else {
            return Err(std::io::Error::other("reader is closed").into());
        };
        let raw = match source.read_headers() {
            Ok(raw) => raw,
            Err(e) => {
                self.report_failure(&e);
                self.state = State::Failed {
                    message: e.to_string(),
                    category: e.category(),
                };
                return Err(e);
            }
        };

        let mut names = canonical_headers(&raw, self.options.clean_headers);
        // A source column that already carries the row-number name suppresses numbering.
        let numbered =
            self.options.add_rownum && !names.iter().any(|n| *n == self.options.rownum_field);
        if numbered {
            names.push(self.options.rownum_field.clone());
        }

        log::info!(
            "{} schema for {}: {:?}",
            self.ctx.format,
            self.ctx.source,
            names
        );
        if let Some(obs) = self.options.observer.as_ref() {
            obs.on_schema(&self.ctx, &names);
        }

        let layout = Arc::new(RecordLayout::new(names));
        self.state = State::Ready {
            layout: Arc::clone(&layout),
            numbered,
        };
        Ok((layout, numbered))
    }

    fn report_failure(&self, e: &ReaderError) {
        if let Some(obs) = self.options.observer.as_ref() {
            let sev = ReaderSeverity::for_error(e);
            obs.on_failure(&self.ctx, sev, e);
            if sev >= self.options.alert_at_or_above {
                obs.on_alert(&self.ctx, sev, e);
            }
        }
    }
}

impl<S: RowSource> Iterator for Reader<S> {
    type Item = ReaderResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}

impl<S: RowSource> Drop for Reader<S> {
    fn drop(&mut self) {
        self.close();
    }
}
