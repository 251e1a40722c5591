use std::path::{Path, PathBuf};

use pqfeed_result::{Error, Result};

use crate::footer::Footer;
use crate::types::HandleId;

/// An opened Parquet source and its decoded footer.
///
/// Owned by the registry; readers borrow it through an `Arc`.
#[derive(Debug)]
pub struct FileHandle {
    id: HandleId,
    path: PathBuf,
    footer: Footer,
}

impl FileHandle {
    pub(crate) fn new(id: HandleId, path: PathBuf, footer: Footer) -> Self {
        Self { id, path, footer }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    /// Canonical path of the source.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn footer(&self) -> &Footer {
        &self.footer
    }

    /// Fail if the file no longer matches the size and modification time its
    /// footer was decoded from.
    ///
    /// Row-group offsets in the cached footer are meaningless once the file is
    /// rewritten in place.
    pub fn ensure_unchanged(&self) -> Result<()> {
        let stat = match std::fs::metadata(&self.path) {
            Ok(stat) => stat,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FileNotFound(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        let expected = self.footer.file_size();
        if stat.len() != expected {
            return Err(Error::corrupt_footer(
                &self.path,
                format!("file size changed from {expected} to {} bytes since open", stat.len()),
            ));
        }
        if let (Some(opened), Ok(current)) = (self.footer.modified(), stat.modified()) {
            if opened != current {
                return Err(Error::corrupt_footer(&self.path, "file modified since open"));
            }
        }
        Ok(())
    }
}
