use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};

use crate::error::{ErrorCategory, ReaderError};

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReaderSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (operation failed).
    Error,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

impl ReaderSeverity {
    /// Severity assigned to a reader failure.
    pub fn for_error(e: &ReaderError) -> Self {
        match e.category() {
            ErrorCategory::Io => ReaderSeverity::Critical,
            _ => ReaderSeverity::Error,
        }
    }
}

/// Context about the reader reporting an event.
#[derive(Debug, Clone)]
pub struct ReaderContext {
    /// Human-readable description of the input (usually a path).
    pub source: String,
    /// Format name of the row source (`"csv"`, `"ndjson"`, ...).
    pub format: &'static str,
}

/// Stats reported when a reader runs out of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderStats {
    /// Number of records yielded.
    pub records: usize,
}

/// Observer interface for reader lifecycle events.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait ReaderObserver: Send + Sync {
    /// Called once the canonical headers are resolved.
    fn on_schema(&self, _ctx: &ReaderContext, _headers: &[String]) {}

    /// Called when the reader reaches the end of its rows.
    fn on_exhausted(&self, _ctx: &ReaderContext, _stats: ReaderStats) {}

    /// Called when schema discovery or a row read fails.
    fn on_failure(&self, _ctx: &ReaderContext, _severity: ReaderSeverity, _error: &ReaderError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &ReaderContext, severity: ReaderSeverity, error: &ReaderError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ReaderObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn ReaderObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl CompositeObserver {
    fn each(&self, f: impl Fn(&dyn ReaderObserver)) {
        self.observers.iter().for_each(|o| f(o.as_ref()));
    }
}

impl ReaderObserver for CompositeObserver {
    fn on_schema(&self, ctx: &ReaderContext, headers: &[String]) {
        self.each(|o| o.on_schema(ctx, headers));
    }

    fn on_exhausted(&self, ctx: &ReaderContext, stats: ReaderStats) {
        self.each(|o| o.on_exhausted(ctx, stats));
    }

    fn on_failure(&self, ctx: &ReaderContext, severity: ReaderSeverity, error: &ReaderError) {
        self.each(|o| o.on_failure(ctx, severity, error));
    }

    // Forwarded as alerts so members keep their own alert handling.
    fn on_alert(&self, ctx: &ReaderContext, severity: ReaderSeverity, error: &ReaderError) {
        self.each(|o| o.on_alert(ctx, severity, error));
    }
}

/// Logs reader events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl ReaderObserver for StdErrObserver {
    fn on_schema(&self, ctx: &ReaderContext, headers: &[String]) {
        eprintln!(
            "[reader][schema] format={} source={} columns={}",
            ctx.format,
            ctx.source,
            headers.len()
        );
    }

    fn on_exhausted(&self, ctx: &ReaderContext, stats: ReaderStats) {
        eprintln!(
            "[reader][done] format={} source={} records={}",
            ctx.format, ctx.source, stats.records
        );
    }

    fn on_failure(&self, ctx: &ReaderContext, severity: ReaderSeverity, error: &ReaderError) {
        eprintln!(
            "[reader][{:?}] format={} source={} err={}",
            severity, ctx.format, ctx.source, error
        );
    }

    fn on_alert(&self, ctx: &ReaderContext, severity: ReaderSeverity, error: &ReaderError) {
        eprintln!(
            "[ALERT][reader][{:?}] format={} source={} err={}",
            severity, ctx.format, ctx.source, error
        );
    }
}

/// Forwards reader events to the `log` facade.
#[derive(Debug, Default)]
pub struct LogObserver;

impl ReaderObserver for LogObserver {
    fn on_schema(&self, ctx: &ReaderContext, headers: &[String]) {
        log::info!(
            "schema resolved format={} source={} headers={:?}",
            ctx.format,
            ctx.source,
            headers
        );
    }

    fn on_exhausted(&self, ctx: &ReaderContext, stats: ReaderStats) {
        log::info!(
            "reader exhausted format={} source={} records={}",
            ctx.format,
            ctx.source,
            stats.records
        );
    }

    fn on_failure(&self, ctx: &ReaderContext, severity: ReaderSeverity, error: &ReaderError) {
        log::error!(
            "reader failed severity={:?} format={} source={} err={}",
            severity,
            ctx.format,
            ctx.source,
            error
        );
    }
}

/// Appends one line per reader event to a local log file.
///
/// Line layout: `<utc rfc3339> <event> format=<format> source=<source> <details>`, where event is
/// one of `schema`, `done`, `fail`, `alert`. Writes are best effort: a log file that cannot be
/// opened or written only produces a `debug!` message.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    /// Log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(&self, event: &str, ctx: &ReaderContext, details: fmt::Arguments<'_>) {
        let line = format!(
            "{} {event} format={} source={} {details}",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            ctx.format,
            ctx.source
        );
        let _guard = self.lock.lock().ok();
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| writeln!(f, "{line}"));
        if let Err(e) = written {
            log::debug!("reader event log {} not written: {e}", self.path.display());
        }
    }
}

impl ReaderObserver for FileObserver {
    fn on_schema(&self, ctx: &ReaderContext, headers: &[String]) {
        self.record("schema", ctx, format_args!("headers={}", headers.join(",")));
    }

    fn on_exhausted(&self, ctx: &ReaderContext, stats: ReaderStats) {
        self.record("done", ctx, format_args!("records={}", stats.records));
    }

    fn on_failure(&self, ctx: &ReaderContext, severity: ReaderSeverity, error: &ReaderError) {
        self.record("fail", ctx, format_args!("severity={severity:?} err={error}"));
    }

    fn on_alert(&self, ctx: &ReaderContext, severity: ReaderSeverity, error: &ReaderError) {
        self.record("alert", ctx, format_args!("severity={severity:?} err={error}"));
    }
}
