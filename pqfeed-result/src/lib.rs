//! Error types and result definitions for pqfeed.
//!
//! Every pqfeed crate returns [`Result<T>`], whose error variant is the single
//! [`Error`] enum defined here. Errors propagate upward with `?`; callers that
//! need to react to a specific failure match on the variant.
//!
//! # Error Categories
//!
//! - **Lookup failures** ([`Error::FileNotFound`]): the source path does not exist
//! - **Format errors** ([`Error::CorruptFooter`], [`Error::UnsupportedFormatVersion`],
//!   [`Error::UnsupportedEncoding`], [`Error::UnsupportedCompression`]): the file
//!   cannot be decoded by this reader. These are fatal and never retried.
//! - **Caller errors** ([`Error::InvalidColumnSelection`], [`Error::InvalidChunkSize`],
//!   [`Error::ClosedHandleUse`]): bugs in the calling code, reported immediately
//! - **Handler failures** ([`Error::HandlerFailure`]): a chunk handler returned an
//!   error, aborting the read
//! - **Shared loads** ([`Error::SharedLoadFailed`]): a memoized dataset loader failed
//! - **Wrapped library errors** ([`Error::Io`], [`Error::Arrow`], [`Error::Parquet`])
//!
//! A handler asking the chunked reader to stop is *not* an error; it completes the
//! read successfully with partial results.

pub mod error;
pub mod result;

pub use error::{BoxError, Error};
pub use result::Result;
