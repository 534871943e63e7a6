//! Region partitioning and heap-array adjacency.
//!
//! A file of `file_length` bytes is cut into `count` regions of
//! `floor(file_length / count)` bytes each; region `i` belongs to node `i`
//! of an implicit complete binary tree where the children of `i` are
//! `2i + 1` and `2i + 2`. Trailing `file_length % count` bytes fall outside
//! every region and never reach the checksum.

use crate::error::{HtreeError, Result};

/// Byte window `[offset, offset + length)` of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: u64,
    pub length: u64,
}

impl Window {
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

/// One unit of work: a node index and the region it hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub index: usize,
    pub partitions: usize,
    pub window: Window,
}

/// Which children a node has under the heap-array rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fanout {
    Leaf,
    Left(usize),
    Both(usize, usize),
}

impl Fanout {
    pub fn len(&self) -> usize {
        match self {
            Fanout::Leaf => 0,
            Fanout::Left(_) => 1,
            Fanout::Both(_, _) => 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.is_leaf()
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Fanout::Leaf)
    }
}

/// Validated partitioning of a source into equal regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    file_length: u64,
    count: usize,
    region_length: u64,
}

impl Partition {
    /// Rejects zero partitions and any count that leaves regions empty.
    pub fn new(file_length: u64, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(HtreeError::ZeroPartitions);
        }
        let region_length = file_length / count as u64;
        if region_length == 0 {
            return Err(HtreeError::EmptyRegion {
                file_length,
                partitions: count,
            });
        }
        Ok(Self {
            file_length,
            count,
            region_length,
        })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn file_length(&self) -> u64 {
        self.file_length
    }

    pub fn region_length(&self) -> u64 {
        self.region_length
    }

    /// Bytes past the last region, excluded from every hash.
    pub fn truncated_bytes(&self) -> u64 {
        self.file_length % self.count as u64
    }

    pub fn window(&self, index: usize) -> Window {
        debug_assert!(index < self.count);
        Window {
            offset: index as u64 * self.region_length,
            length: self.region_length,
        }
    }

    pub fn descriptor(&self, index: usize) -> NodeDescriptor {
        NodeDescriptor {
            index,
            partitions: self.count,
            window: self.window(index),
        }
    }

    pub fn fanout(&self, index: usize) -> Fanout {
        let exists = |child: Option<usize>| child.filter(|&c| c < self.count);
        let left = exists(index.checked_mul(2).and_then(|i| i.checked_add(1)));
        let right = exists(index.checked_mul(2).and_then(|i| i.checked_add(2)));
        match (left, right) {
            (Some(l), Some(r)) => Fanout::Both(l, r),
            (Some(l), None) => Fanout::Left(l),
            _ => Fanout::Leaf,
        }
    }

    /// Parent index and the input slot (1 = left, 2 = right) the child fills.
    pub fn parent(index: usize) -> Option<(usize, usize)> {
        if index == 0 {
            return None;
        }
        let slot = if index % 2 == 1 { 1 } else { 2 };
        Some(((index - 1) / 2, slot))
    }
}

/// All windows for `file_length` bytes split `count` ways, in node order.
pub fn partition(file_length: u64, count: usize) -> Result<Vec<Window>> {
    let layout = Partition::new(file_length, count)?;
    Ok((0..count).map(|i| layout.window(i)).collect())
}
