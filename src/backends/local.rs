use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};

use super::{checked_range, ByteSource};
use crate::error::{HtreeError, Result};

/// Local file backend: the file is opened read-only and memory-mapped once.
/// Every node view is a borrowed slice of the same mapping.
pub struct LocalBackend {
    path: PathBuf,
    length: u64,
    // Zero-length files are never mapped.
    map: Option<Mmap>,
}

impl LocalBackend {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let access = |source| HtreeError::FileAccess {
            path: path.clone(),
            source,
        };
        let file = File::open(&path).map_err(access)?;
        let length = file.metadata().map_err(access)?.len();
        let map = if length == 0 {
            None
        } else {
            // SAFETY: the mapping is read-only. Another process truncating or
            // rewriting the file underneath us breaks determinism of the
            // checksum, which the caller accepts by hashing a live file.
            Some(unsafe { MmapOptions::new().map(&file) }.map_err(access)?)
        };
        log::debug!("Mapped {} ({} bytes)", path.display(), length);
        Ok(Self { path, length, map })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for LocalBackend {
    fn len(&self) -> u64 {
        self.length
    }

    fn view(&self, offset: u64, length: u64) -> Result<&[u8]> {
        let range = checked_range(offset, length, self.length)?;
        match self.map.as_ref() {
            Some(map) => Ok(&map[range]),
            None => Ok(&[]),
        }
    }
}
