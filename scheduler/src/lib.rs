// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Scheduling: work queues, the priority planner, the parallel topological
//! runner, and retry policies.

mod planner;
mod pool;
mod queue;
mod retry;

use fnv::FnvHashMap;

use graph::{NodeId, PlanGraph};

pub use crate::planner::get_priorities;
pub use crate::pool::{
    default_worker_count, run_on_graph, MaxErrors, NodeError, RunGraphError,
};
pub use crate::queue::{Item, WorkQueue};
pub use crate::retry::{Retry, RetryPredicate, RetryWrapper};

///
/// The queue policy used to pick the next ready node.
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Scheduler {
    /// Attempts to finish parts of the plan before starting others, using
    /// the priority planner.
    #[default]
    Default,
    /// Picks a random ready node.
    Random,
    /// Plain FIFO; only useful where order cannot matter, such as the
    /// staleness analysis.
    Cheap,
}

/// Builds the work queue for a graph under the given policy.
pub fn create_queue(graph: &PlanGraph, scheduler: Scheduler) -> WorkQueue {
    match scheduler {
        Scheduler::Cheap => WorkQueue::fifo(),
        Scheduler::Random => WorkQueue::random(),
        Scheduler::Default => {
            let priorities: FnvHashMap<NodeId, usize> = get_priorities(graph);
            WorkQueue::with_priorities(priorities)
        }
    }
}

#[cfg(test)]
mod tests;
