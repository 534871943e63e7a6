//! Tree orchestration.
//!
//! Every node hashes its own region, waits for the results of its children
//! (if any) and folds them in with [`combine`]. The value of node 0 is the
//! checksum. Two schedulers are provided and agree bit for bit:
//! - [`Strategy::Pool`]: a bounded set of workers pulls node indices from a
//!   queue; whichever worker supplies a node's last missing input combines it
//!   and carries the result on to the parent. Nobody blocks on a child.
//! - [`Strategy::Spawn`]: one thread per node, each parent spawning and
//!   joining its children.

pub mod pool;
pub mod recursive;

use std::fmt;

use crate::backends::ByteSource;
use crate::combine::combine;
use crate::error::Result;
use crate::mixer::{mix, HashValue};
use crate::observer::{NoopObserver, TreeObserver};
use crate::partition::{Fanout, NodeDescriptor, Partition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Strategy {
    /// Bounded worker pool
    #[default]
    Pool,
    /// One thread per tree node
    Spawn,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Pool => write!(f, "pool"),
            Strategy::Spawn => write!(f, "spawn"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TreeOptions {
    pub strategy: Strategy,
    /// Upper bound on pool threads. Ignored by [`Strategy::Spawn`].
    pub workers: usize,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            workers: num_cpus::get().max(1),
        }
    }
}

/// State shared read-only by every thread of one computation.
pub(crate) struct Context<'a> {
    pub(crate) source: &'a dyn ByteSource,
    pub(crate) partition: Partition,
    pub(crate) observer: &'a dyn TreeObserver,
}

impl Context<'_> {
    pub(crate) fn own_hash(&self, node: &NodeDescriptor) -> Result<HashValue> {
        let hash = mix(self.source.window(node.window)?);
        log::debug!(
            "Node {} hashed [{}, {}) -> {}",
            node.index,
            node.window.offset,
            node.window.end(),
            hash
        );
        self.observer.region_hashed(node.index, hash);
        Ok(hash)
    }

    /// Final value of `index` once every child result is in, left first.
    pub(crate) fn finish(&self, index: usize, own: HashValue, children: &[HashValue]) -> HashValue {
        let hash = if children.is_empty() {
            own
        } else {
            let hash = combine(own, children);
            log::debug!("Node {} combined {} {:?} -> {}", index, own, children, hash);
            hash
        };
        self.observer.node_completed(index, hash);
        hash
    }

    pub(crate) fn fanout(&self, index: usize) -> Fanout {
        self.partition.fanout(index)
    }
}

/// Compute the hash tree checksum of `source` split into `partitions` regions.
///
/// The partitioning is validated before any thread is started: zero
/// partitions, or so many that regions would be empty, are rejected.
pub fn evaluate(
    source: &dyn ByteSource,
    partitions: usize,
    options: &TreeOptions,
    observer: &dyn TreeObserver,
) -> Result<HashValue> {
    let partition = Partition::new(source.len(), partitions)?;
    if partition.truncated_bytes() > 0 {
        log::warn!(
            "Ignoring the trailing {} bytes that do not fill a region",
            partition.truncated_bytes()
        );
    }
    log::info!(
        "Hashing {} bytes as {} regions of {} bytes ({} strategy)",
        partition.file_length(),
        partition.count(),
        partition.region_length(),
        options.strategy
    );

    let ctx = Context {
        source,
        partition,
        observer,
    };
    let hash = match options.strategy {
        Strategy::Pool => pool::run(&ctx, options.workers)?,
        Strategy::Spawn => recursive::run(&ctx)?,
    };
    log::info!("Root node finished with {}", hash);
    Ok(hash)
}

/// [`evaluate`] with default options and no instrumentation.
pub fn checksum(source: &dyn ByteSource, partitions: usize) -> Result<HashValue> {
    evaluate(source, partitions, &TreeOptions::default(), &NoopObserver)
}
