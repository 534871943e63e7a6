//! Project overview:
//! - Content-derived checksum of a file computed as a hash tree
//! - The file is cut into `partitions` equal regions, one per node of an implicit binary heap
//! - Every node hashes its region; parents fold in their children's results bottom-up
//! - Nodes run concurrently on a bounded worker pool, or one thread per node
//!
//! Key behaviors:
//! - Region `i` covers `[i * len, (i + 1) * len)` with `len = file_length / partitions`;
//!   trailing bytes that do not fill a region are not hashed
//! - Children of node `i` are `2i + 1` and `2i + 2` when they exist
//! - A node's value is `mix(decimal(own) ++ decimal(left) ++ decimal(right))`, or its own
//!   region hash when it is a leaf
//! - The file is memory-mapped once and shared read-only by every thread
//!
//! Flags:
//! - strategy: `pool` (bounded, default) or `spawn` (thread per node)
//! - workers: upper bound on pool threads
pub mod backends;
pub mod combine;
pub mod error;
pub mod mixer;
pub mod observer;
pub mod partition;
pub mod tree;
pub mod utils;

pub use backends::{open_source, ByteSource, LocalBackend, MemoryBackend};
pub use combine::combine;
pub use error::{HtreeError, Result};
pub use mixer::{mix, HashValue};
pub use observer::{NoopObserver, ProgressObserver, TreeObserver};
pub use partition::{partition, Fanout, NodeDescriptor, Partition, Window};
pub use tree::{checksum, evaluate, Strategy, TreeOptions};

use std::path::Path;

/// Open `path` read-only and compute its checksum.
pub fn checksum_file<P: AsRef<Path>>(
    path: P,
    partitions: usize,
    options: &TreeOptions,
    observer: &dyn TreeObserver,
) -> Result<HashValue> {
    let source = LocalBackend::open(path)?;
    evaluate(&source, partitions, options, observer)
}
