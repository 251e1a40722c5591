//! Parquet data access for load-testing harnesses.
//!
//! This crate reads Parquet files into loosely shaped [`Record`]s for consumption
//! by many parallel execution contexts. Footers are validated and decoded once per
//! file, rows are read either in full or as bounded chunks, and a one-time read can
//! be frozen into a [`SharedDataset`] that every worker reads without locking.
//!
//! # Architecture
//!
//! - [`Footer`]: validates the trailing `PAR1` block and derives [`Schema`] and [`Metadata`]
//! - [`RowGroupDecoder`]: decodes the projected column chunks of one row group, rejecting
//!   unsupported codecs and encodings up front
//! - [`assemble_records`]: turns decoded columns into [`Record`]s honoring a [`Projection`]
//! - [`stream_chunks`]: drives row-group-at-a-time iteration through a caller handler
//!   that answers [`ChunkControl::Continue`] or [`ChunkControl::Stop`]
//! - [`ParquetRegistry`]: tracks open handles by canonical path with explicit close
//! - [`SharedDataset`]: memoizes a one-time load for concurrent readers
//!
//! Page decompression and decoding is delegated to the `parquet` crate's Arrow reader.
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use pqfeed_parquet::{ChunkControl, ParquetRegistry, ReadOptions};
//!
//! # fn main() -> pqfeed_result::Result<()> {
//! let registry = ParquetRegistry::default();
//!
//! let metadata = registry.metadata("users.parquet")?;
//! println!("{} rows in {} row groups", metadata.num_rows, metadata.num_row_groups);
//!
//! let first_ten = registry.read(
//!     "users.parquet",
//!     &ReadOptions::new().with_columns(["id", "name"]).with_row_limit(10),
//! )?;
//! assert!(first_ten.len() <= 10);
//!
//! let summary = registry.read_chunked("users.parquet", 1000, |chunk| {
//!     let done = chunk.iter().any(|r| r.get("name").and_then(|v| v.as_str()) == Some("stop"));
//!     Ok::<_, std::convert::Infallible>(if done { ChunkControl::Stop } else { ChunkControl::Continue })
//! })?;
//! println!("streamed {} rows", summary.rows);
//!
//! registry.close();
//! # Ok(())
//! # }
//! ```

mod assemble;
mod config;
mod dataset;
mod footer;
mod handle;
mod page;
mod reader;
mod registry;
mod stream;
mod types;
mod value;

pub use assemble::{Projection, assemble_records};
pub use config::{
    BATCH_SIZE_ENV, DEFAULT_BATCH_SIZE, MAX_FORMAT_VERSION, PARALLEL_COLUMNS_ENV, ReaderConfig,
};
pub use dataset::SharedDataset;
pub use footer::{FOOTER_SIZE, Footer, PARQUET_MAGIC};
pub use handle::FileHandle;
pub use page::{
    RowGroupDecoder, RowGroupSlice, check_row_group, is_supported_codec, is_supported_encoding,
};
pub use reader::{plan_row_groups, read_records};
pub use registry::{ParquetRegistry, RegistryStats};
pub use stream::{ChunkControl, StreamSummary, stream_chunks};
pub use types::{
    ColumnChunkInfo, Field, HandleId, Metadata, PhysicalType, ReadOptions, Repetition,
    RowGroupInfo, Schema,
};
pub use value::{Record, Value};

// Re-export common types for convenience
pub use arrow::record_batch::RecordBatch;
pub use pqfeed_result::{Error, Result};
