// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use itertools::Itertools;

use graph::{EdgeKey, NodeId, PlanGraph};
use plan::Plan;

///
/// Removes every node that is not an ancestor of a required node or of the
/// output node, then removes literals whose only remaining purpose is
/// ordering and whose removal does not grow the graph.
///
pub fn prune_plan(plan: &mut Plan, required_nodes: &[NodeId], output_node: Option<NodeId>) {
    let mut roots = required_nodes.to_vec();
    roots.extend(output_node);
    let keep = plan.graph.all_ancestors(roots);
    let prune: Vec<NodeId> = plan
        .graph
        .node_ids()
        .filter(|id| !keep.contains(id))
        .collect();
    for id in prune {
        plan.graph.remove_node(id);
    }

    let literals: Vec<NodeId> = plan
        .graph
        .node_ids()
        .filter(|&id| plan.graph.node(id).is_literal() && Some(id) != output_node)
        .collect();
    for literal in literals {
        prune_literal_if_trivial(&mut plan.graph, literal);
    }
}

///
/// Prunes the literal if it is not an argument to any call and the
/// dependencies synthesised to replace it do not outnumber the edges
/// removed with it.
///
fn prune_literal_if_trivial(graph: &mut PlanGraph, literal: NodeId) {
    if graph.out_edges(literal).any(|(_, key)| key.is_argument()) {
        return;
    }
    let predecessors = graph.predecessors(literal);
    let successors = graph.successors(literal);
    let m = predecessors.len();
    let n = successors.len();
    if m * n > m + n {
        return;
    }
    for (&predecessor, &successor) in predecessors.iter().cartesian_product(successors.iter()) {
        graph.add_edge(predecessor, successor, EdgeKey::Dependency);
    }
    graph.remove_node(literal);
}

///
/// Removes literals with no predecessors. When a predicate is given, only
/// literals it accepts are removed.
///
pub fn prune_source_literals(plan: &mut Plan, predicate: Option<&dyn Fn(NodeId) -> bool>) {
    let source_literals: Vec<NodeId> = plan
        .graph
        .node_ids()
        .filter(|&id| plan.graph.node(id).is_literal() && plan.graph.is_source(id))
        .filter(|&id| predicate.map_or(true, |accept| accept(id)))
        .collect();
    for id in source_literals {
        plan.graph.remove_node(id);
    }
}
