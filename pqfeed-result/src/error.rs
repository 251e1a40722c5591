use std::path::PathBuf;
use std::sync::Arc;
use std::{fmt, io};
use thiserror::Error;

/// Boxed error produced by caller-supplied logic, such as a chunk handler.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Unified error type for all pqfeed operations.
///
/// Decode-time variants describe a file this reader cannot process and are never
/// recovered from internally. Caller-error variants describe misuse of the API.
///
/// # Thread Safety
///
/// `Error` implements `Send` and `Sync`. A failed shared dataset hands the same
/// underlying error to every execution context that touches it, so this matters.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while opening, sizing or reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Arrow error while building or converting decoded columns.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error raised while decoding pages of a supported column chunk.
    ///
    /// Footer problems are reported as [`Error::CorruptFooter`] instead; this
    /// variant covers failures found while reading data pages.
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// The requested source does not exist.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The trailing metadata block is missing, truncated or unparsable.
    ///
    /// Raised when the `PAR1` magic marker is absent, the footer length field
    /// points outside the file, or the metadata itself fails to decode.
    #[error("corrupt footer in {}: {reason}", path.display())]
    CorruptFooter { path: PathBuf, reason: String },

    /// The footer declares a format version newer than this reader implements.
    #[error("unsupported format version {version} in {} (max supported {max})", path.display())]
    UnsupportedFormatVersion {
        path: PathBuf,
        version: i32,
        max: i32,
    },

    /// A projected column chunk uses an encoding this reader does not decode.
    #[error("unsupported encoding {encoding} for column '{column}'")]
    UnsupportedEncoding { column: String, encoding: String },

    /// A projected column chunk uses a compression codec this reader does not decode.
    #[error("unsupported compression {codec} for column '{column}'")]
    UnsupportedCompression { column: String, codec: String },

    /// A requested column is not a top-level field of the schema.
    #[error("column '{column}' is not in the schema (available: {})", available.join(", "))]
    InvalidColumnSelection {
        column: String,
        available: Vec<String>,
    },

    /// Chunked reads require a chunk size of at least one row.
    #[error("invalid chunk size {0}: must be greater than zero")]
    InvalidChunkSize(usize),

    /// The path was released by `close()` and was not explicitly reopened.
    #[error("handle for {} was closed", .0.display())]
    ClosedHandleUse(PathBuf),

    /// A chunk handler failed; the read was aborted.
    #[error("chunk handler failed: {0}")]
    HandlerFailure(#[source] BoxError),

    /// The one-time loader of a shared dataset failed.
    ///
    /// Every context that reads the dataset receives this variant wrapping the
    /// same original error.
    #[error("shared dataset '{name}' failed to load: {source}")]
    SharedLoadFailed {
        name: String,
        #[source]
        source: Arc<Error>,
    },

    /// Invalid user input or API parameter.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// Internal error indicating a bug or unexpected state.
    #[error("An internal operation failed: {0}")]
    Internal(String),
}

impl Error {
    /// Create a corrupt footer error for `path` from any displayable reason.
    #[inline]
    pub fn corrupt_footer<E: fmt::Display>(path: impl Into<PathBuf>, reason: E) -> Self {
        Error::CorruptFooter {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Wrap the error returned by a chunk handler.
    ///
    /// # Examples
    ///
    /// ```
    /// use pqfeed_result::Error;
    ///
    /// let err = Error::handler_failure("downstream rejected chunk");
    /// assert!(matches!(err, Error::HandlerFailure(_)));
    /// assert!(err.to_string().contains("downstream rejected chunk"));
    /// ```
    #[inline]
    pub fn handler_failure<E: Into<BoxError>>(err: E) -> Self {
        Error::HandlerFailure(err.into())
    }

    /// Whether the error comes from the file contents rather than from the caller.
    ///
    /// Format errors are fatal and must not be retried.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Error::CorruptFooter { .. }
                | Error::UnsupportedFormatVersion { .. }
                | Error::UnsupportedEncoding { .. }
                | Error::UnsupportedCompression { .. }
                | Error::Parquet(_)
        )
    }
}
