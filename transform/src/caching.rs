// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Staleness analysis and value-store splicing.
//!
//! The analysis walks the graph in topological order, flowing modified
//! times downstream and marking every registered node whose stored value
//! can no longer be trusted. The splice then gives every registered node an
//! explicit read call, and every stale one a write call (or a barrier, for
//! sources) ordered before the read.

use std::sync::Arc;

use chrono::NaiveDateTime;
use fnv::{FnvHashMap, FnvHashSet};
use log::debug;
use parking_lot::Mutex;

use graph::value::{self, BoxError};
use graph::{Callable, EdgeKey, NodeId, Scope, Signature};
use plan::{Plan, SymVal};
use progress::{ProgressObserver, Section};
use registry::{Registry, RegistryEntry};
use scheduler::{create_queue, run_on_graph, MaxErrors, Retry, RunGraphError, Scheduler};
use store::{Timestamp, ValueStore};

use crate::pruning::{prune_plan, prune_source_literals};

/// The inert value carried by barrier literals. A barrier orders a stale
/// source's re-read after its upstream work without writing anything.
#[derive(Clone, Copy, Debug)]
pub struct Barrier;

#[derive(Default)]
struct StaleSlot {
    stale: bool,
    modified: Option<NaiveDateTime>,
}

fn probe_modified_time(
    retry: &Retry,
    store: &Arc<dyn ValueStore>,
) -> Result<Option<Timestamp>, BoxError> {
    let probed = retry.run(&mut || store.get_modified_time().map(value::new))?;
    Ok(*value::get::<Option<Timestamp>>(&probed).expect("the probe boxes a modified time"))
}

fn analyse_node(
    plan: &Plan,
    registry: &Registry,
    retry: &Retry,
    fresh_time: Option<NaiveDateTime>,
    slots: &FnvHashMap<NodeId, Mutex<StaleSlot>>,
    node: NodeId,
) -> Result<(), BoxError> {
    let predecessors = plan.graph.predecessors(node);
    for predecessor in &predecessors {
        if slots[predecessor].lock().stale {
            slots[&node].lock().stale = true;
            return Ok(());
        }
    }
    let max_ancestor_modified = predecessors
        .iter()
        .filter_map(|predecessor| slots[predecessor].lock().modified)
        .max();

    let entry = match registry.entry(node) {
        None => {
            slots[&node].lock().modified = max_ancestor_modified;
            return Ok(());
        }
        Some(entry) => entry,
    };
    let modified = match probe_modified_time(retry, &entry.store)? {
        None => {
            slots[&node].lock().stale = true;
            return Ok(());
        }
        Some(modified) => modified.to_naive_utc(),
    };

    // A source with no upstream modified time is deliberately skewed toward
    // re-reading rather than re-writing: only fresh_time can make it stale.
    let threshold = if entry.is_source && max_ancestor_modified.is_none() {
        [Some(modified), fresh_time]
    } else {
        [max_ancestor_modified.max(Some(modified)), fresh_time]
    }
    .into_iter()
    .flatten()
    .max()
    .expect("the node's own modified time is always present");

    let mut slot = slots[&node].lock();
    if threshold > modified {
        slot.stale = true;
    } else {
        slot.modified = Some(modified);
    }
    Ok(())
}

///
/// Finds the registered nodes whose stores must be refreshed. Runs on the
/// worker pool with the cheap queue; staleness moves flags, not values, so
/// scheduling order cannot matter.
///
fn get_stale_nodes(
    plan: &Plan,
    registry: &Registry,
    retry: &Retry,
    worker_count: usize,
    fresh_time: Option<Timestamp>,
    observer: &dyn ProgressObserver,
) -> Result<FnvHashSet<NodeId>, RunGraphError> {
    let mut working = plan.clone();
    prune_source_literals(&mut working, Some(&|id| !registry.contains(id)));
    let fresh_time = fresh_time.map(Timestamp::to_naive_utc);

    let mut totals: FnvHashMap<Scope, usize> = FnvHashMap::default();
    for id in working.graph.node_ids() {
        if working.graph.node(id).is_call() {
            *totals
                .entry(working.graph.node(id).scope().clone())
                .or_default() += 1;
        }
    }
    for (scope, count) in &totals {
        observer.increment_total(Section::Stale, scope, *count);
    }

    let slots: FnvHashMap<NodeId, Mutex<StaleSlot>> = working
        .graph
        .node_ids()
        .map(|id| (id, Mutex::new(StaleSlot::default())))
        .collect();

    {
        let working = &working;
        let slots = &slots;
        let process = |node: NodeId| -> Result<(), BoxError> {
            let scope = working.graph.node(node).is_call().then(|| {
                let scope = working.graph.node(node).scope().clone();
                observer.increment_running(Section::Stale, &scope);
                scope
            });
            let result = analyse_node(working, registry, retry, fresh_time, slots, node);
            if let Some(scope) = scope {
                observer.increment_completed(Section::Stale, &scope);
            }
            result
        };
        let queue = create_queue(&working.graph, Scheduler::Cheap);
        run_on_graph(
            &working.graph,
            process,
            worker_count,
            MaxErrors::default(),
            &queue,
        )?;
    }

    Ok(slots
        .into_iter()
        .filter_map(|(id, slot)| slot.into_inner().stale.then_some(id))
        .collect())
}

///
/// Splices the read and (if stale) write calls for one registered node, and
/// reroutes its out-edges: argument edges move to the read node, dependency
/// edges to the refresh node. Returns `(write_or_barrier, read)`.
///
fn splice_store(
    plan: &mut Plan,
    node: NodeId,
    entry: &RegistryEntry,
    is_stale: bool,
) -> (Option<NodeId>, NodeId) {
    let out_edges: Vec<(NodeId, EdgeKey)> = plan
        .graph
        .out_edges(node)
        .map(|(successor, key)| (successor, key.clone()))
        .collect();

    let scope_tags = plan.graph.node(node).scope().tags().to_vec();
    let scope_guard = plan.scope(scope_tags);

    let read_callable = {
        let store = Arc::clone(&entry.store);
        Callable::with_signature("read", Signature::exact(0), move |_| store.read())
    };
    let read_node = plan
        .call_with_site(entry.site.clone(), &read_callable, Vec::new(), Vec::new())
        .expect("read takes no arguments");

    let mut refresh_node = None;
    if is_stale {
        let inserted = if entry.is_source {
            let barrier = plan.lit(Barrier).expect("Barrier is not a node");
            for predecessor in plan.graph.predecessors(node) {
                plan.graph.add_edge(predecessor, barrier, EdgeKey::Dependency);
            }
            barrier
        } else {
            let write_callable = {
                let store = Arc::clone(&entry.store);
                Callable::with_signature("write", Signature::exact(1), move |args| {
                    store.write(&args.args[0])?;
                    Ok(value::new(()))
                })
            };
            plan.call_with_site(
                entry.site.clone(),
                &write_callable,
                vec![SymVal::Node(node)],
                Vec::new(),
            )
            .expect("write takes one argument")
        };
        plan.graph.add_edge(inserted, read_node, EdgeKey::Dependency);
        refresh_node = Some(inserted);
    }
    drop(scope_guard);

    for (successor, key) in out_edges {
        plan.graph.remove_edge(node, successor, &key);
        if key.is_argument() {
            plan.graph.add_edge(read_node, successor, key);
        } else if let Some(refresh_node) = refresh_node {
            plan.graph.add_edge(refresh_node, successor, EdgeKey::Dependency);
        }
    }
    (refresh_node, read_node)
}

///
/// Turns a logical plan into a physical one: analyses staleness against the
/// registry, splices read/write calls, prunes what is no longer required,
/// and redirects the output node to its read call if it has one.
///
pub fn plan_with_value_stores(
    plan: &mut Plan,
    registry: &Registry,
    output_node: Option<NodeId>,
    worker_count: usize,
    retry: &Retry,
    fresh_time: Option<Timestamp>,
    observer: &dyn ProgressObserver,
) -> Result<Option<NodeId>, RunGraphError> {
    let stale_nodes = get_stale_nodes(plan, registry, retry, worker_count, fresh_time, observer)?;
    debug!(
        "{} of {} registered nodes are stale",
        stale_nodes.len(),
        registry.len()
    );

    let mut required_nodes = Vec::new();
    let mut read_lookup: FnvHashMap<NodeId, NodeId> = FnvHashMap::default();
    for (node, entry) in registry.entries() {
        let (refresh_node, read_node) =
            splice_store(plan, node, entry, stale_nodes.contains(&node));
        if let Some(refresh_node) = refresh_node {
            required_nodes.push(refresh_node);
        }
        read_lookup.insert(node, read_node);
    }

    let redirected = output_node.map(|node| read_lookup.get(&node).copied().unwrap_or(node));
    prune_plan(plan, &required_nodes, redirected);
    Ok(redirected)
}
