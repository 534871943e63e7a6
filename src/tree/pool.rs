//! Bounded worker pool.
//!
//! Node indices are queued up front, leaves first. A worker pops an index,
//! hashes that node's region and deposits the hash into the node's slot.
//! Each slot waits for `1 + children` inputs; the worker that supplies the
//! last one combines the node and deposits the result into the parent's
//! slot, walking up the tree for as long as it keeps completing nodes.
//! The root result leaves through a one-shot channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, ScopedJoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};

use super::Context;
use crate::error::{HtreeError, Result};
use crate::mixer::HashValue;
use crate::partition::{Fanout, Partition};

const OWN: usize = 0;

/// Inputs collected so far for one node: own hash, left result, right result.
struct Slot {
    inputs: [Option<HashValue>; 3],
    pending: usize,
}

struct Board<'c, 'a> {
    ctx: &'c Context<'a>,
    slots: Vec<Mutex<Slot>>,
    done: Sender<HashValue>,
}

impl<'c, 'a> Board<'c, 'a> {
    fn new(ctx: &'c Context<'a>, done: Sender<HashValue>) -> Self {
        let slots = (0..ctx.partition.count())
            .map(|index| {
                Mutex::new(Slot {
                    inputs: [None; 3],
                    pending: 1 + ctx.fanout(index).len(),
                })
            })
            .collect();
        Self { ctx, slots, done }
    }

    /// Store `value` as input `slot` of node `index`, then settle every node
    /// this completes on the way to the root.
    fn deliver(&self, mut index: usize, mut slot: usize, mut value: HashValue) -> Result<()> {
        loop {
            let inputs = {
                let mut node = self.slots[index]
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                node.inputs[slot] = Some(value);
                node.pending -= 1;
                if node.pending > 0 {
                    return Ok(());
                }
                node.inputs
            };

            let Some(own) = inputs[OWN] else {
                log::error!("Node {} completed without its own hash", index);
                return Err(HtreeError::Incomplete);
            };
            let children: Vec<HashValue> = inputs[1..].iter().flatten().copied().collect();
            match self.ctx.fanout(index) {
                Fanout::Leaf => {}
                Fanout::Left(left) => self.ctx.observer.child_joined(index, left),
                Fanout::Both(left, right) => {
                    self.ctx.observer.child_joined(index, left);
                    self.ctx.observer.child_joined(index, right);
                }
            }
            let result = self.ctx.finish(index, own, &children);

            match Partition::parent(index) {
                Some((parent, parent_slot)) => {
                    index = parent;
                    slot = parent_slot;
                    value = result;
                }
                None => {
                    let _ = self.done.send(result);
                    return Ok(());
                }
            }
        }
    }
}

fn work(board: &Board<'_, '_>, queue: &Receiver<usize>, abort: &AtomicBool) -> Result<()> {
    while let Ok(index) = queue.recv() {
        if abort.load(Ordering::Relaxed) {
            break;
        }
        let node = board.ctx.partition.descriptor(index);
        match board.ctx.own_hash(&node).and_then(|own| board.deliver(index, OWN, own)) {
            Ok(()) => {}
            Err(e) => {
                log::error!("Node {} failed: {}", index, e);
                abort.store(true, Ordering::Relaxed);
                return Err(e);
            }
        }
    }
    Ok(())
}

fn worker_name(worker: usize) -> String {
    format!("htree-worker-{worker}")
}

pub(crate) fn run(ctx: &Context<'_>, workers: usize) -> Result<HashValue> {
    let count = ctx.partition.count();
    let workers = workers.clamp(1, count);

    let (tx, rx) = unbounded();
    for index in (0..count).rev() {
        let _ = tx.send(index);
    }
    drop(tx);

    let (done_tx, done_rx) = bounded(1);
    let board = Board::new(ctx, done_tx);
    let abort = AtomicBool::new(false);
    let mut errors = Vec::new();

    thread::scope(|s| {
        let mut handles: Vec<(usize, ScopedJoinHandle<'_, Result<()>>)> =
            Vec::with_capacity(workers);
        for worker in 0..workers {
            let rx = rx.clone();
            let board = &board;
            let abort = &abort;
            let spawned = thread::Builder::new()
                .name(worker_name(worker))
                .spawn_scoped(s, move || work(board, &rx, abort));
            match spawned {
                Ok(handle) => handles.push((worker, handle)),
                Err(source) => {
                    log::error!("Could not spawn worker {}: {}", worker, source);
                    abort.store(true, Ordering::Relaxed);
                    errors.push(HtreeError::SpawnFailure {
                        thread: worker_name(worker),
                        source,
                    });
                    break;
                }
            }
        }
        log::debug!("Started {} workers for {} nodes", handles.len(), count);

        for (worker, handle) in handles {
            match handle.join() {
                Ok(Ok(())) => log::debug!("Joined worker {}", worker),
                Ok(Err(e)) => errors.push(e),
                Err(_) => {
                    abort.store(true, Ordering::Relaxed);
                    errors.push(HtreeError::WorkerPanicked {
                        thread: worker_name(worker),
                    });
                }
            }
        }
    });

    if let Some(err) = errors.into_iter().next() {
        return Err(err);
    }
    done_rx.try_recv().map_err(|_| HtreeError::Incomplete)
}
