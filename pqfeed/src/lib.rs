//! pqfeed: Parquet data feeds for load-testing harnesses
//!
//! This crate is the primary entrypoint for the pqfeed toolkit. It re-exports the
//! Parquet access layer from `pqfeed-parquet` and the shared error type from
//! `pqfeed-result`, and hosts the `pqfeed` command-line tool.
//!
//! # Quick Start
//!
//! Load a file once during setup, share it with every worker, release it at teardown:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pqfeed::{ParquetRegistry, ReadOptions, SharedDataset};
//!
//! # fn main() -> pqfeed::Result<()> {
//! let registry = Arc::new(ParquetRegistry::default());
//! let users = SharedDataset::from_parquet(
//!     Arc::clone(&registry),
//!     "users",
//!     "data/users.parquet",
//!     ReadOptions::new().with_columns(["id", "email"]),
//! );
//! users.load()?;
//!
//! std::thread::scope(|scope| {
//!     for worker in 0..4 {
//!         let users = users.clone();
//!         scope.spawn(move || {
//!             let rows = users.rows().unwrap();
//!             let row = &rows[worker % rows.len()];
//!             println!("worker {worker} uses {:?}", row.get("email"));
//!         });
//!     }
//! });
//!
//! registry.close();
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Errors** (`pqfeed-result`): one error enum covering format, caller and handler failures.
//! - **Access layer** (`pqfeed-parquet`): footer decoding, page decoding, record assembly,
//!   chunked streaming, the handle registry and shared datasets.
//! - **CLI** ([`cli`]): JSON output of schema, metadata, records and chunk streams.

pub mod cli;

pub use pqfeed_parquet::{
    ChunkControl, ColumnChunkInfo, Field, FileHandle, HandleId, Metadata, ParquetRegistry,
    PhysicalType, ReadOptions, ReaderConfig, Record, RegistryStats, Repetition, RowGroupInfo,
    Schema, SharedDataset, StreamSummary, Value,
};
pub use pqfeed_result::{BoxError, Error, Result};
