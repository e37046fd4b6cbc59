// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The symbolic call-graph data model.
//!
//! A plan's graph is a directed multigraph: nodes are literal values or
//! deferred calls, and edges are positional arguments, keyword arguments, or
//! ordering-only dependencies. Between any ordered pair of nodes there may be
//! several edges, distinguished (and deduplicated) by their [`EdgeKey`].

mod callable;
mod edge;
mod errors;
mod node;
mod scope;
mod site;
pub mod value;

use fnv::FnvHashMap;
use fnv::FnvHashSet;
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

pub use crate::callable::{
    func0, func1, func2, func3, try_func0, try_func1, try_func2, CallArgs, Callable, Signature,
};
pub use crate::edge::EdgeKey;
pub use crate::errors::{CallError, HasACycle};
pub use crate::node::{Call, Literal, Node, NodeId};
pub use crate::scope::{Scope, Tag};
pub use crate::site::{render_symbolic_traceback, CallSite, Frame, MAX_SYMBOLIC_DEPTH};
pub use crate::value::{BoxError, Composite, Value};

///
/// A directed multigraph of symbolic values, keyed by stable node ids.
///
/// The graph itself enforces nothing about acyclicity; the plan builder only
/// adds edges that cannot create cycles, and transformations call
/// [`PlanGraph::assert_acyclic`] before execution.
///
#[derive(Clone, Default)]
pub struct PlanGraph {
    pg: StableDiGraph<Node, EdgeKey, u32>,
}

impl PlanGraph {
    pub fn new() -> PlanGraph {
        PlanGraph {
            pg: StableDiGraph::default(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.pg.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.pg.edge_count()
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.pg.add_node(node)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.pg.contains_node(id)
    }

    /// The node with the given id, which must be present.
    pub fn node(&self, id: NodeId) -> &Node {
        self.pg
            .node_weight(id)
            .expect("the node is present in the graph")
    }

    pub fn try_node(&self, id: NodeId) -> Option<&Node> {
        self.pg.node_weight(id)
    }

    /// Replaces the node with the given id, keeping all incident edges.
    pub fn replace_node(&mut self, id: NodeId, node: Node) {
        *self
            .pg
            .node_weight_mut(id)
            .expect("the node is present in the graph") = node;
    }

    pub fn remove_node(&mut self, id: NodeId) {
        self.pg.remove_node(id);
    }

    ///
    /// Adds an edge. Two edges of the same kind between the same ordered pair
    /// of nodes are equal, so redundant additions collapse to a single edge.
    ///
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, key: EdgeKey) {
        if !self.has_edge(from, to, &key) {
            self.pg.add_edge(from, to, key);
        }
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId, key: &EdgeKey) -> bool {
        self.pg
            .edges_connecting(from, to)
            .any(|edge| edge.weight() == key)
    }

    /// Removes the edge of the given kind, returning whether it was present.
    pub fn remove_edge(&mut self, from: NodeId, to: NodeId, key: &EdgeKey) -> bool {
        let edge_id = self
            .pg
            .edges_connecting(from, to)
            .find(|edge| edge.weight() == key)
            .map(|edge| edge.id());
        match edge_id {
            Some(edge_id) => {
                self.pg.remove_edge(edge_id);
                true
            }
            None => false,
        }
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.pg.node_indices()
    }

    /// In-edges of the given node as `(predecessor, key)` pairs.
    pub fn in_edges(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &EdgeKey)> + '_ {
        self.pg
            .edges_directed(id, Direction::Incoming)
            .map(|edge| (edge.source(), edge.weight()))
    }

    /// Out-edges of the given node as `(successor, key)` pairs.
    pub fn out_edges(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &EdgeKey)> + '_ {
        self.pg
            .edges_directed(id, Direction::Outgoing)
            .map(|edge| (edge.target(), edge.weight()))
    }

    /// Distinct predecessor nodes, in first-seen edge order.
    pub fn predecessors(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = FnvHashSet::default();
        let mut predecessors = Vec::new();
        for (predecessor, _) in self.in_edges(id) {
            if seen.insert(predecessor) {
                predecessors.push(predecessor);
            }
        }
        predecessors
    }

    /// Distinct successor nodes, in first-seen edge order.
    pub fn successors(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = FnvHashSet::default();
        let mut successors = Vec::new();
        for (successor, _) in self.out_edges(id) {
            if seen.insert(successor) {
                successors.push(successor);
            }
        }
        successors
    }

    /// The number of distinct predecessor nodes.
    pub fn predecessor_count(&self, id: NodeId) -> usize {
        self.predecessors(id).len()
    }

    /// True if the node has no predecessors.
    pub fn is_source(&self, id: NodeId) -> bool {
        self.in_edges(id).next().is_none()
    }

    pub fn source_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.node_ids().filter(|&id| self.is_source(id))
    }

    ///
    /// The symbolic args and kwargs of the given call, reconstructed from its
    /// argument in-edges. Argument indices are contiguous by construction.
    ///
    pub fn argument_nodes(&self, id: NodeId) -> (Vec<NodeId>, Vec<(String, NodeId)>) {
        let mut positional_count = 0;
        let mut keyword_count = 0;
        for (_, key) in self.in_edges(id) {
            match key {
                EdgeKey::Positional(..) => positional_count += 1,
                EdgeKey::Keyword(..) => keyword_count += 1,
                EdgeKey::Dependency => {}
            }
        }
        let mut args: Vec<Option<NodeId>> = vec![None; positional_count];
        let mut kwargs: Vec<Option<(String, NodeId)>> = vec![None; keyword_count];
        for (predecessor, key) in self.in_edges(id) {
            match key {
                EdgeKey::Positional(index) => args[*index] = Some(predecessor),
                EdgeKey::Keyword(name, index) => {
                    kwargs[*index] = Some((name.clone(), predecessor))
                }
                EdgeKey::Dependency => {}
            }
        }
        (
            args.into_iter()
                .map(|arg| arg.expect("argument indices are contiguous"))
                .collect(),
            kwargs
                .into_iter()
                .map(|kwarg| kwarg.expect("keyword argument indices are contiguous"))
                .collect(),
        )
    }

    /// All nodes having a path to any of the given roots, including the
    /// roots themselves.
    pub fn all_ancestors(&self, roots: impl IntoIterator<Item = NodeId>) -> FnvHashSet<NodeId> {
        let mut visited = FnvHashSet::default();
        let mut frontier: Vec<NodeId> = roots.into_iter().collect();
        while let Some(id) = frontier.pop() {
            if !visited.insert(id) {
                continue;
            }
            frontier.extend(self.predecessors(id));
        }
        visited
    }

    ///
    /// The nodes in topological order, via Kahn's algorithm over distinct
    /// predecessor counts.
    ///
    pub fn topological_sort(&self) -> Result<Vec<NodeId>, HasACycle> {
        let mut remaining: FnvHashMap<NodeId, usize> = FnvHashMap::default();
        let mut queue = Vec::new();
        for id in self.node_ids() {
            let count = self.predecessor_count(id);
            if count == 0 {
                queue.push(id);
            } else {
                remaining.insert(id, count);
            }
        }

        let mut order = Vec::with_capacity(self.node_count());
        while let Some(id) = queue.pop() {
            for successor in self.successors(id) {
                let count = remaining
                    .get_mut(&successor)
                    .expect("every successor has a predecessor count");
                *count -= 1;
                if *count == 0 {
                    queue.push(successor);
                }
            }
            order.push(id);
        }

        if order.len() < self.node_count() {
            return Err(HasACycle);
        }
        Ok(order)
    }

    pub fn assert_acyclic(&self) -> Result<(), HasACycle> {
        self.topological_sort().map(|_| ())
    }
}
