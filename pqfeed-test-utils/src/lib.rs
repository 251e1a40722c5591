//! Shared helpers for pqfeed tests and benchmarks.
//!
//! - [`init_tracing_for_tests`] installs a `tracing` subscriber once per test binary.
//! - [`fixtures`] writes small, deterministic Parquet files with `ArrowWriter`.

use std::sync::Once;

pub mod fixtures;

pub use fixtures::{
    nested_batch, three_column_batch, user_age, user_metadata, user_name, users_batch,
    users_schema, write_batches, write_users_file, writer_props,
};

static INIT: Once = Once::new();

/// Initialize tracing for test binaries. Safe to call multiple times.
pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        use tracing_subscriber::fmt;
        let env = std::env::var("RUST_LOG").ok();
        let filter = match env {
            Some(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            None => EnvFilter::new("info"),
        };
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_test_writer()
            .try_init();
    });
}
