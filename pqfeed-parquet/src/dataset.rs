//! Immutable datasets shared across execution contexts.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use pqfeed_result::{Error, Result};

use crate::registry::ParquetRegistry;
use crate::types::ReadOptions;
use crate::value::Record;

type Loader<T> = Box<dyn FnOnce() -> Result<Vec<T>> + Send + 'static>;

/// A lazily loaded, read-only collection of rows.
///
/// Cloning is cheap and every clone observes the same load. The loader runs at
/// most once, on the first access from any clone; concurrent first accesses
/// block until it finishes. A failed load is memoized and reported to every
/// caller as [`Error::SharedLoadFailed`]; it is never retried.
///
/// # Examples
///
/// ```
/// use pqfeed_parquet::SharedDataset;
///
/// let data = SharedDataset::new("numbers", || Ok(vec![1_u32, 2, 3]));
/// let worker = data.clone();
/// let handle = std::thread::spawn(move || worker.len());
///
/// assert_eq!(handle.join().unwrap().unwrap(), 3);
/// assert_eq!(data.get(1).unwrap(), Some(&2));
/// ```
pub struct SharedDataset<T = Record> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    name: String,
    loader: Mutex<Option<Loader<T>>>,
    rows: OnceLock<std::result::Result<Arc<[T]>, Arc<Error>>>,
}

impl<T> Clone for SharedDataset<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for SharedDataset<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedDataset")
            .field("name", &self.inner.name)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl<T: Send + Sync + 'static> SharedDataset<T> {
    pub fn new<F>(name: impl Into<String>, loader: F) -> Self
    where
        F: FnOnce() -> Result<Vec<T>> + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                loader: Mutex::new(Some(Box::new(loader))),
                rows: OnceLock::new(),
            }),
        }
    }

    /// A dataset that is already loaded.
    pub fn from_rows(name: impl Into<String>, rows: Vec<T>) -> Self {
        let dataset = Self {
            inner: Arc::new(Inner {
                name: name.into(),
                loader: Mutex::new(None),
                rows: OnceLock::new(),
            }),
        };
        let _ = dataset.inner.rows.set(Ok(rows.into()));
        dataset
    }
}

impl<T> SharedDataset<T> {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether the loader has finished, successfully or not.
    pub fn is_loaded(&self) -> bool {
        self.inner.rows.get().is_some()
    }

    /// Run the loader if it has not run yet.
    pub fn load(&self) -> Result<()> {
        self.rows().map(|_| ())
    }

    pub fn rows(&self) -> Result<&[T]> {
        self.state().map(|rows| &**rows)
    }

    /// Shared ownership of the rows, for consumers that outlive the borrow.
    pub fn shared_rows(&self) -> Result<Arc<[T]>> {
        self.state().map(Arc::clone)
    }

    pub fn get(&self, index: usize) -> Result<Option<&T>> {
        Ok(self.rows()?.get(index))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.rows()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.rows()?.is_empty())
    }

    fn state(&self) -> Result<&Arc<[T]>> {
        let inner = &self.inner;
        let state = inner.rows.get_or_init(|| {
            let loader = inner
                .loader
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            let Some(loader) = loader else {
                return Err(Arc::new(Error::Internal(
                    "dataset loader already consumed".into(),
                )));
            };
            tracing::debug!(dataset = %inner.name, "loading shared dataset");
            match loader() {
                Ok(rows) => {
                    tracing::debug!(dataset = %inner.name, rows = rows.len(), "shared dataset loaded");
                    Ok(rows.into())
                }
                Err(err) => {
                    tracing::warn!(dataset = %inner.name, error = %err, "shared dataset failed to load");
                    Err(Arc::new(err))
                }
            }
        });

        state.as_ref().map_err(|source| Error::SharedLoadFailed {
            name: inner.name.clone(),
            source: Arc::clone(source),
        })
    }
}

impl SharedDataset<Record> {
    /// Dataset of the rows of `path` selected by `options`, read through `registry`.
    pub fn from_parquet(
        registry: Arc<ParquetRegistry>,
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        options: ReadOptions,
    ) -> Self {
        let path = path.into();
        Self::new(name, move || registry.read(&path, &options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn loader_runs_on_first_access_only() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let data = SharedDataset::new("letters", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec!['a', 'b'])
        });

        assert!(!data.is_loaded());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(data.len().unwrap(), 2);
        assert_eq!(data.clone().rows().unwrap(), ['a', 'b']);
        assert!(data.is_loaded());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failure_is_memoized() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let data: SharedDataset<u8> = SharedDataset::new("broken", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::InvalidArgumentError("nope".into()))
        });

        for _ in 0..3 {
            match data.rows() {
                Err(Error::SharedLoadFailed { name, source }) => {
                    assert_eq!(name, "broken");
                    assert!(matches!(*source, Error::InvalidArgumentError(_)));
                }
                other => panic!("unexpected: {other:?}"),
            }
        }
        assert!(data.is_loaded());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn preloaded_rows() {
        let data = SharedDataset::from_rows("fixed", vec![10, 20]);
        assert!(data.is_loaded());
        assert_eq!(data.get(1).unwrap(), Some(&20));
        assert_eq!(data.get(2).unwrap(), None);
        assert!(!data.is_empty().unwrap());
        assert_eq!(data.shared_rows().unwrap().len(), 2);
    }
}
