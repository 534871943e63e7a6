//! Instrumentation hooks for a running computation.
//!
//! Observers are shared by every thread of the tree, so hooks take `&self`
//! and may be called concurrently.

use indicatif::{ProgressBar, ProgressStyle};

use crate::mixer::HashValue;

pub trait TreeObserver: Sync {
    /// A dedicated thread was spawned for `child` by `parent`.
    fn child_spawned(&self, _parent: usize, _child: usize) {}

    fn region_hashed(&self, _index: usize, _hash: HashValue) {}

    /// The result of `child` was absorbed by `parent`.
    fn child_joined(&self, _parent: usize, _child: usize) {}

    fn node_completed(&self, _index: usize, _hash: HashValue) {}
}

pub struct NoopObserver;

impl TreeObserver for NoopObserver {}

/// Progress bar ticking once per completed node.
pub struct ProgressObserver {
    pb: ProgressBar,
}

impl ProgressObserver {
    pub fn new(nodes: usize) -> Self {
        let pb = ProgressBar::new(nodes as u64);
        let style = ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} nodes ({eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
        pb.set_style(style);
        Self { pb }
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

impl TreeObserver for ProgressObserver {
    fn node_completed(&self, _index: usize, _hash: HashValue) {
        self.pb.inc(1);
    }
}
