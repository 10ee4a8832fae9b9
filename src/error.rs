use thiserror::Error;

/// Convenience result type for reader operations.
pub type ReaderResult<T> = Result<T, ReaderError>;

/// Error type returned by readers and the dispatch entry point.
///
/// This is a single error enum shared across every format adapter and the shared core.
#[derive(Debug, Error)]
pub enum ReaderError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Excel decoding error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// CSV tokenizer error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The JSON document could not be parsed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The XML document could not be parsed.
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A header-cleaning level outside the recognized range was requested.
    #[error("invalid header cleaning level: {value} (expected 0-4 or a level name)")]
    InvalidCleanLevel { value: String },

    /// No reader exists for the file extension and no fixed-width fallback was configured.
    #[error("unsupported file format: '{extension}'")]
    UnsupportedFormat { extension: String },

    /// The format is known but support for it was not compiled in.
    #[error("{format} reading not enabled (enable cargo feature '{feature}')")]
    FormatNotEnabled {
        format: &'static str,
        feature: &'static str,
    },

    /// A fixed-width column definition is unusable.
    #[error("invalid column spec: {message}")]
    InvalidColumnSpec { message: String },

    /// The input parsed but does not have the required shape.
    #[error("malformed input: {message}")]
    MalformedInput { message: String },

    /// A path expression could not be compiled.
    #[error("invalid path expression '{expression}': {message}")]
    InvalidPath { expression: String, message: String },

    /// The input has no records to build a schema from.
    #[error("empty input: {message}")]
    EmptyInput { message: String },

    /// Schema discovery finished without finding any column.
    #[error("no keys discovered: {message}")]
    NoKeys { message: String },

    /// Schema discovery already failed for this reader; carries the original failure.
    #[error("schema unavailable: {message}")]
    SchemaUnavailable {
        message: String,
        category: ErrorCategory,
    },
}

/// Coarse classification of a [`ReaderError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad caller-supplied configuration; raised at construction or call time.
    Configuration,
    /// The document or an expression could not be parsed.
    MalformedInput,
    /// The input is structurally valid but has nothing to discover a schema from.
    EmptyInput,
    /// Operating-system level failure.
    Io,
}

impl ReaderError {
    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReaderError::Io(_) => ErrorCategory::Io,
            ReaderError::Csv(err) => match err.kind() {
                ::csv::ErrorKind::Io(_) => ErrorCategory::Io,
                _ => ErrorCategory::MalformedInput,
            },
            #[cfg(feature = "excel")]
            ReaderError::Excel(_) => ErrorCategory::MalformedInput,
            ReaderError::Json(err) if err.is_io() => ErrorCategory::Io,
            ReaderError::Json(_) => ErrorCategory::MalformedInput,
            ReaderError::Xml(quick_xml::Error::Io(_)) => ErrorCategory::Io,
            ReaderError::Xml(_) => ErrorCategory::MalformedInput,
            ReaderError::MalformedInput { .. } | ReaderError::InvalidPath { .. } => {
                ErrorCategory::MalformedInput
            }
            ReaderError::EmptyInput { .. } | ReaderError::NoKeys { .. } => ErrorCategory::EmptyInput,
            ReaderError::SchemaUnavailable { category, .. } => *category,
            ReaderError::InvalidCleanLevel { .. }
            | ReaderError::UnsupportedFormat { .. }
            | ReaderError::FormatNotEnabled { .. }
            | ReaderError::InvalidColumnSpec { .. } => ErrorCategory::Configuration,
        }
    }
}
