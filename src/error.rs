use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HtreeError {
    /// The file could not be opened, stat'ed or mapped.
    #[error("cannot access {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("partition count must be at least 1")]
    ZeroPartitions,

    /// `file_length / partitions` rounds down to zero bytes per region.
    #[error("{partitions} partitions over {file_length} bytes leaves every region empty")]
    EmptyRegion { file_length: u64, partitions: usize },

    #[error("range [{offset}, {offset}+{length}) is outside a source of {source_length} bytes")]
    OutOfBounds {
        offset: u64,
        length: u64,
        source_length: u64,
    },

    #[error("failed to spawn thread {thread}: {source}")]
    SpawnFailure {
        thread: String,
        #[source]
        source: std::io::Error,
    },

    #[error("thread {thread} panicked")]
    WorkerPanicked { thread: String },

    #[error("computation stopped before the root node completed")]
    Incomplete,
}

pub type Result<T> = std::result::Result<T, HtreeError>;
