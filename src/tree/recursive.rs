//! One thread per node.
//!
//! Each parent spawns a scoped thread per existing child, joins them in
//! left-to-right order and only then combines. Concurrency is unbounded:
//! `partitions` threads exist over the life of the computation.

use std::thread::{self, ScopedJoinHandle};

use super::Context;
use crate::error::{HtreeError, Result};
use crate::mixer::HashValue;
use crate::partition::{Fanout, NodeDescriptor};

pub(crate) fn run(ctx: &Context<'_>) -> Result<HashValue> {
    evaluate_node(ctx, ctx.partition.descriptor(0))
}

fn thread_name(index: usize) -> String {
    format!("htree-node-{index}")
}

fn evaluate_node(ctx: &Context<'_>, node: NodeDescriptor) -> Result<HashValue> {
    let own = ctx.own_hash(&node)?;
    let children = match ctx.fanout(node.index) {
        Fanout::Leaf => return Ok(ctx.finish(node.index, own, &[])),
        Fanout::Left(left) => vec![left],
        Fanout::Both(left, right) => vec![left, right],
    };

    let results = thread::scope(|s| -> Result<Vec<HashValue>> {
        let mut handles: Vec<(usize, ScopedJoinHandle<'_, Result<HashValue>>)> =
            Vec::with_capacity(children.len());
        let mut spawn_error = None;
        for &child in &children {
            let descriptor = ctx.partition.descriptor(child);
            let spawned = thread::Builder::new()
                .name(thread_name(child))
                .spawn_scoped(s, move || evaluate_node(ctx, descriptor));
            match spawned {
                Ok(handle) => {
                    ctx.observer.child_spawned(node.index, child);
                    handles.push((child, handle));
                }
                Err(source) => {
                    log::error!("Node {} could not spawn child {}: {}", node.index, child, source);
                    spawn_error = Some(HtreeError::SpawnFailure {
                        thread: thread_name(child),
                        source,
                    });
                    break;
                }
            }
        }

        // Join everything that started, even after a failure, so no child
        // outlives this node.
        let joined: Vec<(usize, Result<HashValue>)> = handles
            .into_iter()
            .map(|(child, handle)| {
                let result = handle.join().unwrap_or_else(|_| {
                    Err(HtreeError::WorkerPanicked {
                        thread: thread_name(child),
                    })
                });
                (child, result)
            })
            .collect();

        if let Some(err) = spawn_error {
            return Err(err);
        }
        let mut results = Vec::with_capacity(joined.len());
        for (child, result) in joined {
            results.push(result?);
            ctx.observer.child_joined(node.index, child);
        }
        Ok(results)
    })?;

    Ok(ctx.finish(node.index, own, &results))
}
