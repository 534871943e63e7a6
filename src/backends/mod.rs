pub mod local;
pub mod memory;

use std::path::Path;
use std::sync::Arc;

use crate::error::{HtreeError, Result};
use crate::partition::Window;

pub use local::LocalBackend;
pub use memory::MemoryBackend;

/// Read-only byte content shared by every node of a computation.
///
/// Views borrow from the source and are never written through, so any
/// number of threads may hold views of disjoint (or overlapping) ranges.
pub trait ByteSource: Send + Sync {
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow `[offset, offset + length)`; fails if it leaves the source.
    fn view(&self, offset: u64, length: u64) -> Result<&[u8]>;

    fn window(&self, window: Window) -> Result<&[u8]> {
        self.view(window.offset, window.length)
    }
}

/// Open `path` read-only as a shared byte source.
pub fn open_source<P: AsRef<Path>>(path: P) -> Result<Arc<dyn ByteSource>> {
    Ok(Arc::new(LocalBackend::open(path)?))
}

/// Bounds-check a view request against a source of `source_length` bytes
/// and return it as a `usize` range.
pub(crate) fn checked_range(
    offset: u64,
    length: u64,
    source_length: u64,
) -> Result<std::ops::Range<usize>> {
    let out_of_bounds = || HtreeError::OutOfBounds {
        offset,
        length,
        source_length,
    };
    let end = offset.checked_add(length).ok_or_else(out_of_bounds)?;
    if end > source_length {
        return Err(out_of_bounds());
    }
    let start = usize::try_from(offset).map_err(|_| out_of_bounds())?;
    let end = usize::try_from(end).map_err(|_| out_of_bounds())?;
    Ok(start..end)
}
