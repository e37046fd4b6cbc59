// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Node priorities that bound peak value liveness.
//!
//! A pseudo-sink is a node whose out-edges are all dependencies, so nothing
//! downstream consumes its value. Finishing one pseudo-sink before starting
//! the next frees every value that was produced exclusively for it, which
//! keeps the number of simultaneously live values low. The approach:
//!
//! 1. Contract nodes connected by argument edges, ignoring the outgoing
//!    edges of literals, into super-nodes.
//! 2. Contract the strongly connected components of that graph (contraction
//!    ignores direction around literals, so cycles can appear) to obtain the
//!    condensation, which is always a DAG.
//! 3. Enumerate pseudo-sinks in a topological order of the condensation,
//!    and walk each one's not-yet-visited argument ancestors in reverse
//!    pre-order. A node's position in the concatenated walks is its
//!    priority, with lower positions scheduled first.
//!

use fixedbitset::FixedBitSet;
use fnv::{FnvHashMap, FnvHashSet};
use log::debug;
use petgraph::algo::{kosaraju_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;

use graph::{NodeId, PlanGraph};

fn is_pseudo_sink(graph: &PlanGraph, id: NodeId) -> bool {
    graph.out_edges(id).all(|(_, key)| !key.is_argument())
}

///
/// Returns a mapping from node to priority, with the lowest priority being
/// the most important. Priorities are the contiguous range `0..n`.
///
pub fn get_priorities(graph: &PlanGraph) -> FnvHashMap<NodeId, usize> {
    let mut priorities = FnvHashMap::default();
    if graph.node_count() == 0 {
        return priorities;
    }
    let bound = graph
        .node_ids()
        .map(|id| id.index())
        .max()
        .expect("the graph is non-empty")
        + 1;

    // Weak contraction: union argument edges, ignoring literal out-edges.
    let mut components = UnionFind::<usize>::new(bound);
    for from in graph.node_ids() {
        if graph.node(from).is_literal() {
            continue;
        }
        for (to, key) in graph.out_edges(from) {
            if key.is_argument() {
                components.union(from.index(), to.index());
            }
        }
    }

    // The contracted digraph, one node per component representative.
    let mut contracted: DiGraph<(), ()> = DiGraph::new();
    let mut component_nodes: FnvHashMap<usize, NodeIndex> = FnvHashMap::default();
    let mut members: FnvHashMap<NodeIndex, Vec<NodeId>> = FnvHashMap::default();
    for id in graph.node_ids() {
        let representative = components.find(id.index());
        let contracted_id = *component_nodes
            .entry(representative)
            .or_insert_with(|| contracted.add_node(()));
        members.entry(contracted_id).or_default().push(id);
    }
    let mut contracted_edges: FnvHashSet<(NodeIndex, NodeIndex)> = FnvHashSet::default();
    for from in graph.node_ids() {
        for (to, _) in graph.out_edges(from) {
            let contracted_from = component_nodes[&components.find(from.index())];
            let contracted_to = component_nodes[&components.find(to.index())];
            if contracted_from != contracted_to
                && contracted_edges.insert((contracted_from, contracted_to))
            {
                contracted.add_edge(contracted_from, contracted_to, ());
            }
        }
    }

    // Condense strongly connected components of the contracted digraph.
    let sccs = kosaraju_scc(&contracted);
    let mut scc_of = vec![0; contracted.node_count()];
    let mut condensation: DiGraph<usize, ()> = DiGraph::new();
    for (scc_index, scc) in sccs.iter().enumerate() {
        condensation.add_node(scc_index);
        for &contracted_id in scc {
            scc_of[contracted_id.index()] = scc_index;
        }
    }
    let mut condensation_edges: FnvHashSet<(usize, usize)> = FnvHashSet::default();
    for &(contracted_from, contracted_to) in &contracted_edges {
        let scc_from = scc_of[contracted_from.index()];
        let scc_to = scc_of[contracted_to.index()];
        if scc_from != scc_to && condensation_edges.insert((scc_from, scc_to)) {
            condensation.add_edge(NodeIndex::new(scc_from), NodeIndex::new(scc_to), ());
        }
    }
    let order =
        toposort(&condensation, None).expect("the condensation of a digraph is acyclic");

    // Pseudo-sinks in condensation topological order.
    let mut pseudo_sinks = Vec::new();
    for condensed in order {
        for &contracted_id in &sccs[condensation[condensed]] {
            for &id in &members[&contracted_id] {
                if is_pseudo_sink(graph, id) {
                    pseudo_sinks.push(id);
                }
            }
        }
    }
    debug!(
        "prioritising {} nodes via {} pseudo-sinks",
        graph.node_count(),
        pseudo_sinks.len()
    );

    // Reverse pre-order walk over each pseudo-sink's argument ancestors.
    let mut visited = FixedBitSet::with_capacity(bound);
    pseudo_sinks.reverse();
    let mut stack = pseudo_sinks;
    while let Some(id) = stack.pop() {
        if visited.put(id.index()) {
            continue;
        }
        priorities.insert(id, priorities.len());
        for (predecessor, key) in graph.in_edges(id) {
            if key.is_argument() {
                stack.push(predecessor);
            }
        }
    }
    priorities
}
