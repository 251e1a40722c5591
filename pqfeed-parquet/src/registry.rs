//! Registry of open Parquet handles.
//!
//! A [`ParquetRegistry`] is an explicit context object: create one per process
//! (or per test), share it behind an `Arc`, and call [`ParquetRegistry::close`]
//! at teardown. Handles are keyed by canonical path, so `./a.parquet` and an
//! absolute path to the same file share one footer.
//!
//! # Lifecycle
//!
//! - Any query on an unknown path opens it implicitly.
//! - `close()` releases every tracked handle and remembers the released paths.
//! - Implicit use of a released path fails with [`Error::ClosedHandleUse`],
//!   even after the file is deleted; an explicit [`ParquetRegistry::open`]
//!   starts a new handle.
//!
//! Footers are decoded outside the map lock. Each path gets a slot whose
//! first user decodes the footer while later users of that path wait on the
//! slot, so a slow open never blocks queries on other paths.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock};

use pqfeed_result::{BoxError, Error, Result};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::ReaderConfig;
use crate::footer::Footer;
use crate::handle::FileHandle;
use crate::reader::read_records;
use crate::stream::{ChunkControl, StreamSummary, stream_chunks};
use crate::types::{HandleId, Metadata, ReadOptions, Schema};
use crate::value::Record;

#[derive(Default)]
struct HandleSlot {
    handle: OnceLock<Arc<FileHandle>>,
    /// Held while the footer for this path is being decoded.
    decoding: Mutex<()>,
}

impl HandleSlot {
    fn get(&self) -> Option<&Arc<FileHandle>> {
        self.handle.get()
    }
}

#[derive(Default)]
struct RegistryState {
    slots: FxHashMap<PathBuf, Arc<HandleSlot>>,
    released: FxHashSet<PathBuf>,
}

/// Point-in-time counters of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    pub open_handles: usize,
    pub released_paths: usize,
    /// Footers decoded since the registry was created.
    pub footer_decodes: u64,
}

pub struct ParquetRegistry {
    config: ReaderConfig,
    state: RwLock<RegistryState>,
    next_id: AtomicU64,
    footer_decodes: AtomicU64,
}

impl Default for ParquetRegistry {
    fn default() -> Self {
        Self::new(ReaderConfig::default())
    }
}

impl std::fmt::Debug for ParquetRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParquetRegistry")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl ParquetRegistry {
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            config,
            state: RwLock::new(RegistryState::default()),
            next_id: AtomicU64::new(1),
            footer_decodes: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Explicitly open `path`, returning the existing handle if it is already open.
    ///
    /// Clears a previous release of the same path.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Arc<FileHandle>> {
        let path = canonical(path.as_ref())?;
        self.write_state().released.remove(&path);
        self.load(path)
    }

    /// Schema of `path`; decodes only the footer.
    pub fn schema(&self, path: impl AsRef<Path>) -> Result<Arc<Schema>> {
        Ok(Arc::clone(self.acquire(path.as_ref())?.footer().schema()))
    }

    /// Metadata of `path`; decodes only the footer.
    pub fn metadata(&self, path: impl AsRef<Path>) -> Result<Arc<Metadata>> {
        Ok(Arc::clone(self.acquire(path.as_ref())?.footer().metadata()))
    }

    /// Materialize the rows of `path` selected by `options`.
    pub fn read(&self, path: impl AsRef<Path>, options: &ReadOptions) -> Result<Vec<Record>> {
        let handle = self.acquire(path.as_ref())?;
        handle.ensure_unchanged()?;
        read_records(&handle, options, &self.config)
    }

    /// Stream every row of `path` to `handler` in chunks of `chunk_size`.
    ///
    /// See [`stream_chunks`] for the handler protocol.
    pub fn read_chunked<F, E>(
        &self,
        path: impl AsRef<Path>,
        chunk_size: usize,
        handler: F,
    ) -> Result<StreamSummary>
    where
        F: FnMut(Vec<Record>) -> std::result::Result<ChunkControl, E>,
        E: Into<BoxError>,
    {
        self.read_chunked_with_options(path, chunk_size, &ReadOptions::default(), handler)
    }

    /// [`ParquetRegistry::read_chunked`] restricted by `options`.
    pub fn read_chunked_with_options<F, E>(
        &self,
        path: impl AsRef<Path>,
        chunk_size: usize,
        options: &ReadOptions,
        handler: F,
    ) -> Result<StreamSummary>
    where
        F: FnMut(Vec<Record>) -> std::result::Result<ChunkControl, E>,
        E: Into<BoxError>,
    {
        if chunk_size == 0 {
            return Err(Error::InvalidChunkSize(chunk_size));
        }
        let handle = self.acquire(path.as_ref())?;
        handle.ensure_unchanged()?;
        stream_chunks(&handle, chunk_size, options, &self.config, handler)
    }

    /// Release every tracked handle. Returns how many were released.
    ///
    /// Never fails; calling it with nothing open is a no-op.
    pub fn close(&self) -> usize {
        let mut state = self.write_state();
        let RegistryState { slots, released } = &mut *state;
        let mut count = 0;
        for (path, slot) in slots.drain() {
            if slot.get().is_some() {
                count += 1;
            }
            released.insert(path);
        }
        tracing::info!(released = count, "closed parquet handles");
        count
    }

    pub fn is_open(&self, path: impl AsRef<Path>) -> bool {
        registry_key(path.as_ref())
            .map(|key| {
                self.read_state()
                    .slots
                    .get(&key)
                    .is_some_and(|slot| slot.get().is_some())
            })
            .unwrap_or(false)
    }

    /// Canonical paths of open handles, sorted.
    pub fn open_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .read_state()
            .slots
            .iter()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }

    pub fn stats(&self) -> RegistryStats {
        let state = self.read_state();
        RegistryStats {
            open_handles: state.slots.values().filter(|slot| slot.get().is_some()).count(),
            released_paths: state.released.len(),
            footer_decodes: self.footer_decodes.load(Ordering::Relaxed),
        }
    }

    /// Handle for `path`, opening it implicitly unless it was released.
    fn acquire(&self, path: &Path) -> Result<Arc<FileHandle>> {
        let key = registry_key(path)?;
        {
            let state = self.read_state();
            if let Some(handle) = state.slots.get(&key).and_then(|slot| slot.get()) {
                return Ok(Arc::clone(handle));
            }
            if state.released.contains(&key) {
                return Err(Error::ClosedHandleUse(key));
            }
        }
        self.load(key).map_err(|err| match err {
            Error::FileNotFound(_) => Error::FileNotFound(path.to_path_buf()),
            other => other,
        })
    }

    fn load(&self, path: PathBuf) -> Result<Arc<FileHandle>> {
        let slot = {
            let mut state = self.write_state();
            if state.released.contains(&path) {
                return Err(Error::ClosedHandleUse(path));
            }
            Arc::clone(state.slots.entry(path.clone()).or_default())
        };

        let _decoding = slot.decoding.lock().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have decoded the footer while we waited.
        if let Some(handle) = slot.get() {
            return Ok(Arc::clone(handle));
        }
        match self.decode(&path) {
            Ok(handle) => Ok(Arc::clone(slot.handle.get_or_init(|| handle))),
            Err(err) => {
                self.discard_empty_slot(&path, &slot);
                Err(err)
            }
        }
    }

    fn decode(&self, path: &Path) -> Result<Arc<FileHandle>> {
        let file = File::open(path).map_err(|e| not_found_or_io(path, e))?;
        let footer = Footer::decode(path, &file, &self.config)?;
        self.footer_decodes.fetch_add(1, Ordering::Relaxed);

        let id = HandleId(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(handle = id.0, path = %path.display(), "opened parquet handle");
        Ok(Arc::new(FileHandle::new(id, path.to_path_buf(), footer)))
    }

    /// Drop the slot of a failed decode so the path can be retried.
    fn discard_empty_slot(&self, path: &Path, slot: &Arc<HandleSlot>) {
        let mut state = self.write_state();
        let stale = state
            .slots
            .get(path)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && current.get().is_none());
        if stale {
            state.slots.remove(path);
        }
    }

    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn canonical(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).map_err(|e| not_found_or_io(path, e))
}

/// Canonical path of `path`, or of its parent joined with the file name when
/// the file itself no longer exists.
fn registry_key(path: &Path) -> Result<PathBuf> {
    match std::fs::canonicalize(path) {
        Ok(key) => Ok(key),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let parent = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            match (std::fs::canonicalize(parent), path.file_name()) {
                (Ok(dir), Some(name)) => Ok(dir.join(name)),
                _ => Err(Error::FileNotFound(path.to_path_buf())),
            }
        }
        Err(e) => Err(e.into()),
    }
}

fn not_found_or_io(path: &Path, err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::FileNotFound(path.to_path_buf())
    } else {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pqfeed_test_utils::write_users_file;
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn relative_and_absolute_paths_share_a_handle() {
        let dir = TempDir::new().unwrap();
        let path = write_users_file(dir.path(), "users.parquet", 4, 10).unwrap();
        let dotted = dir.path().join(".").join("users.parquet");

        let registry = ParquetRegistry::default();
        let a = registry.open(&path).unwrap();
        let b = registry.open(&dotted).unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(registry.stats().footer_decodes, 1);
        assert_eq!(registry.open_paths().len(), 1);
    }

    #[test]
    fn close_without_handles_is_noop() {
        let registry = ParquetRegistry::default();
        assert_eq!(registry.close(), 0);
        assert_eq!(registry.close(), 0);
        assert_eq!(registry.stats(), RegistryStats::default());
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let registry = ParquetRegistry::default();
        let err = registry.schema(dir.path().join("absent.parquet")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)), "{err}");
        assert!(!registry.is_open(dir.path().join("absent.parquet")));
    }

    #[test]
    fn pending_decode_does_not_block_other_paths() {
        let dir = TempDir::new().unwrap();
        let slow = write_users_file(dir.path(), "slow.parquet", 4, 10).unwrap();
        let ready = write_users_file(dir.path(), "ready.parquet", 4, 10).unwrap();
        let registry = Arc::new(ParquetRegistry::default());
        registry.open(&ready).unwrap();

        // Hold the slot of `slow` as if its footer were still being decoded.
        let slot = Arc::clone(
            registry
                .write_state()
                .slots
                .entry(canonical(&slow).unwrap())
                .or_default(),
        );
        let decoding = slot.decoding.lock().unwrap();

        let waiter = {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || registry.schema(&slow).map(|schema| schema.len()))
        };
        let (tx, rx) = mpsc::channel();
        {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || tx.send(registry.schema(&ready).map(|s| s.len())));
        }
        let ready_len = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("open path answered while another path decodes");
        assert_eq!(ready_len.unwrap(), 6);
        assert_eq!(registry.stats().open_handles, 1);

        drop(decoding);
        assert_eq!(waiter.join().unwrap().unwrap(), 6);
        assert_eq!(registry.stats().open_handles, 2);
        assert_eq!(registry.stats().footer_decodes, 2);
    }

    #[test]
    fn failed_decode_leaves_no_slot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("late.parquet");
        std::fs::write(&path, b"not yet").unwrap();

        let registry = ParquetRegistry::default();
        assert!(matches!(
            registry.schema(&path),
            Err(Error::CorruptFooter { .. })
        ));
        assert!(registry.read_state().slots.is_empty());

        write_users_file(dir.path(), "late.parquet", 3, 10).unwrap();
        assert_eq!(registry.schema(&path).unwrap().len(), 6);
        assert_eq!(registry.stats().open_handles, 1);
    }
}
