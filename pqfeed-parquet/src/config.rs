//! Reader tuning knobs.

use std::env;

use pqfeed_result::{Error, Result};

/// Rows decoded per Arrow batch unless overridden.
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Highest footer format version this reader accepts.
pub const MAX_FORMAT_VERSION: i32 = 2;

pub const BATCH_SIZE_ENV: &str = "PQFEED_BATCH_SIZE";
pub const PARALLEL_COLUMNS_ENV: &str = "PQFEED_PARALLEL_COLUMNS";

/// Configuration shared by every read issued through a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Upper bound on rows held by one decoded batch.
    pub batch_size: usize,
    /// Decode projected columns of a row group concurrently.
    pub parallel_columns: bool,
    pub max_format_version: i32,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            parallel_columns: false,
            max_format_version: MAX_FORMAT_VERSION,
        }
    }
}

impl ReaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `PQFEED_BATCH_SIZE` and `PQFEED_PARALLEL_COLUMNS`.
    ///
    /// Unparsable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = env::var(BATCH_SIZE_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => config.batch_size = size,
                _ => tracing::warn!(
                    value = %raw,
                    "ignoring invalid {BATCH_SIZE_ENV}; using {}",
                    config.batch_size
                ),
            }
        }

        if let Ok(raw) = env::var(PARALLEL_COLUMNS_ENV) {
            match parse_flag(&raw) {
                Some(flag) => config.parallel_columns = flag,
                None => tracing::warn!(value = %raw, "ignoring invalid {PARALLEL_COLUMNS_ENV}"),
            }
        }

        config
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_parallel_columns(mut self, parallel: bool) -> Self {
        self.parallel_columns = parallel;
        self
    }

    #[must_use]
    pub fn with_max_format_version(mut self, version: i32) -> Self {
        self.max_format_version = version;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidArgumentError(
                "batch_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ReaderConfig::default();
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert!(!config.parallel_columns);
        assert_eq!(config.max_format_version, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let config = ReaderConfig::new().with_batch_size(0);
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidArgumentError(_))
        ));
    }

    #[test]
    fn flags_parse() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" 0 "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
