// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Runs a function on every node of an acyclic graph in parallel, in
//! topological order, on a pool of OS threads.

use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use fixedbitset::FixedBitSet;
use fnv::FnvHashMap;
use log::trace;
use parking_lot::Mutex;

use graph::value::BoxError;
use graph::{HasACycle, NodeId, PlanGraph};

use crate::queue::{Item, WorkQueue};

///
/// A failure while processing one node. The node is carried so that callers
/// can attach its symbolic traceback; the original error is the source.
///
#[derive(Debug)]
pub struct NodeError {
    pub node: NodeId,
    cause: BoxError,
}

impl NodeError {
    ///
    /// Wraps a cause, except that an already-wrapped `NodeError` cause is
    /// passed through unchanged so the innermost failing node wins.
    ///
    pub fn new(node: NodeId, cause: BoxError) -> NodeError {
        match cause.downcast::<NodeError>() {
            Ok(node_error) => *node_error,
            Err(cause) => NodeError { node, cause },
        }
    }

    pub fn into_parts(self) -> (NodeId, BoxError) {
        (self.node, self.cause)
    }
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "An error was raised while processing {:?}.", self.node)
    }
}

impl Error for NodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.cause as &(dyn Error + 'static))
    }
}

/// A failure of a whole graph run.
#[derive(Debug)]
pub enum RunGraphError {
    Cycle(HasACycle),
    Node(NodeError),
}

impl fmt::Display for RunGraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunGraphError::Cycle(error) => error.fmt(f),
            RunGraphError::Node(error) => error.fmt(f),
        }
    }
}

impl Error for RunGraphError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RunGraphError::Cycle(error) => Some(error),
            RunGraphError::Node(error) => Some(error),
        }
    }
}

impl From<HasACycle> for RunGraphError {
    fn from(error: HasACycle) -> RunGraphError {
        RunGraphError::Cycle(error)
    }
}

///
/// The error budget: how many node failures are tolerated before new
/// dispatches stop. `Limit(0)` stops after the first error; `Unlimited`
/// runs everything and still raises the first error at the end.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaxErrors {
    Limit(usize),
    Unlimited,
}

impl Default for MaxErrors {
    fn default() -> MaxErrors {
        MaxErrors::Limit(0)
    }
}

/// Matches the thread-pool sizing of typical executors.
pub fn default_worker_count() -> usize {
    std::cmp::min(32, num_cpus::get() + 4)
}

struct FailureState {
    error_count: usize,
    first_error: Option<NodeError>,
}

/// Restores queue accounting however processing an item ends.
struct TaskDoneGuard<'a>(&'a WorkQueue);

impl Drop for TaskDoneGuard<'_> {
    fn drop(&mut self) {
        self.0.task_done();
    }
}

///
/// Runs `process` once per node, in parallel, never visiting a node before
/// all of its predecessors succeeded. Failed nodes do not release their
/// successors. Returns the first failure after all in-flight work quiesced.
///
pub fn run_on_graph<F>(
    graph: &PlanGraph,
    process: F,
    worker_count: usize,
    max_errors: MaxErrors,
    queue: &WorkQueue,
) -> Result<(), RunGraphError>
where
    F: Fn(NodeId) -> Result<(), BoxError> + Sync,
{
    assert!(worker_count >= 1, "worker_count must be at least 1");
    graph.assert_acyclic()?;

    // Single-parent successors are submitted without touching the shared
    // counter map; everything else decrements under one small mutex.
    let mut source_nodes = Vec::new();
    let bound = graph.node_ids().map(|id| id.index() + 1).max().unwrap_or(0);
    let mut single_parent = FixedBitSet::with_capacity(bound);
    let mut counts: FnvHashMap<NodeId, usize> = FnvHashMap::default();
    for id in graph.node_ids() {
        match graph.predecessor_count(id) {
            0 => source_nodes.push(id),
            1 => {
                single_parent.insert(id.index());
            }
            count => {
                counts.insert(id, count);
            }
        }
    }
    let remaining = Mutex::new(counts);

    let stop = AtomicBool::new(false);
    let failure = Mutex::new(FailureState {
        error_count: 0,
        first_error: None,
    });

    let process_node = |node: NodeId| {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        match process(node) {
            Err(cause) => {
                let mut failure = failure.lock();
                failure.error_count += 1;
                if failure.first_error.is_none() {
                    failure.first_error = Some(NodeError::new(node, cause));
                }
                if let MaxErrors::Limit(limit) = max_errors {
                    if failure.error_count > limit {
                        stop.store(true, Ordering::SeqCst);
                    }
                }
            }
            Ok(()) => {
                for successor in graph.successors(node) {
                    if single_parent.contains(successor.index()) {
                        queue.put(Item::Node(successor));
                    } else {
                        let mut remaining = remaining.lock();
                        let count = remaining
                            .get_mut(&successor)
                            .expect("multi-parent successors have a remaining count");
                        *count -= 1;
                        if *count == 0 {
                            queue.put(Item::Node(successor));
                        }
                    }
                }
            }
        }
    };

    trace!(
        "running {} nodes on {} workers ({} sources)",
        graph.node_count(),
        worker_count,
        source_nodes.len()
    );
    thread::scope(|scope| {
        for _ in 0..worker_count {
            scope.spawn(|| loop {
                let item = queue.get();
                let _done = TaskDoneGuard(queue);
                match item {
                    Item::Done => return,
                    Item::Node(node) => process_node(node),
                }
            });
        }

        for &node in &source_nodes {
            queue.put(Item::Node(node));
        }
        queue.join();
        stop.store(true, Ordering::SeqCst);
        for _ in 0..worker_count {
            queue.put(Item::Done);
        }
    });

    match failure.into_inner().first_error {
        Some(first_error) => Err(RunGraphError::Node(first_error)),
        None => Ok(()),
    }
}
