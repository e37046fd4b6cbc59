// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Append-only construction of symbolic call graphs.
//!
//! A [`Plan`] wraps a [`graph::PlanGraph`] and only ever adds nodes and
//! argument edges whose sources already exist, so the builder cannot create
//! a cycle on its own; only `add_dependency` can, and execution checks for
//! that.

pub mod builtins;
mod errors;

use std::any::TypeId;
use std::sync::Arc;

use parking_lot::Mutex;

use graph::value::{self, Value};
use graph::{
    Call, CallSite, Callable, Composite, EdgeKey, Literal, Node, NodeId, PlanGraph, Scope, Tag,
};

pub use crate::errors::{NotTransformedError, PlanError};

///
/// A symbolic argument: either an existing node, a plain value, or one of
/// the four structural containers that `gather` knows how to traverse.
///
pub enum SymVal {
    Node(NodeId),
    Value(Value),
    List(Vec<SymVal>),
    Tuple(Vec<SymVal>),
    Set(Vec<SymVal>),
    Mapping(Vec<(SymVal, SymVal)>),
}

impl SymVal {
    /// Wraps a plain value.
    pub fn of<T: Send + Sync + 'static>(v: T) -> SymVal {
        SymVal::Value(value::new(v))
    }
}

impl From<NodeId> for SymVal {
    fn from(id: NodeId) -> SymVal {
        SymVal::Node(id)
    }
}

enum Gathered {
    Node(NodeId),
    Plain(Value),
}

///
/// Represents a symbolic call graph under construction.
///
pub struct Plan {
    pub graph: PlanGraph,
    scope: Arc<Mutex<Vec<Tag>>>,
}

impl Plan {
    pub fn new() -> Plan {
        Plan {
            graph: PlanGraph::new(),
            scope: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The scope that new nodes are currently created in.
    pub fn current_scope(&self) -> Scope {
        Scope::new(self.scope.lock().clone())
    }

    ///
    /// Adds a function call to this plan.
    ///
    /// Non-symbolic arguments are automatically converted to symbolic
    /// arguments using [`Plan::gather`].
    ///
    #[track_caller]
    pub fn call(
        &mut self,
        callable: &Callable,
        args: impl IntoIterator<Item = SymVal>,
    ) -> Result<NodeId, PlanError> {
        self.call_with_site(
            CallSite::capture("call"),
            callable,
            args.into_iter().collect(),
            Vec::new(),
        )
    }

    /// Adds a function call with keyword arguments to this plan.
    #[track_caller]
    pub fn call_with_kwargs<K: Into<String>>(
        &mut self,
        callable: &Callable,
        args: impl IntoIterator<Item = SymVal>,
        kwargs: impl IntoIterator<Item = (K, SymVal)>,
    ) -> Result<NodeId, PlanError> {
        self.call_with_site(
            CallSite::capture("call"),
            callable,
            args.into_iter().collect(),
            kwargs
                .into_iter()
                .map(|(name, arg)| (name.into(), arg))
                .collect(),
        )
    }

    ///
    /// Adds a function call with an explicitly captured call site. This is
    /// the primitive behind `call`; transformations use it to attribute
    /// spliced calls to the site that registered the store.
    ///
    pub fn call_with_site(
        &mut self,
        site: CallSite,
        callable: &Callable,
        args: Vec<SymVal>,
        kwargs: Vec<(String, SymVal)>,
    ) -> Result<NodeId, PlanError> {
        let keyword_names: Vec<&str> = kwargs.iter().map(|(name, _)| name.as_str()).collect();
        for (index, name) in keyword_names.iter().enumerate() {
            if keyword_names[..index].contains(name) {
                return Err(PlanError::Bind {
                    callable: callable.name().to_owned(),
                    message: format!("duplicate keyword argument '{name}'"),
                });
            }
        }
        if let Some(signature) = callable.signature() {
            signature
                .check_bind(args.len(), &keyword_names)
                .map_err(|message| PlanError::Bind {
                    callable: callable.name().to_owned(),
                    message,
                })?;
        }

        let argument_nodes: Vec<NodeId> = args
            .into_iter()
            .map(|arg| self.gather_with_site(&site, arg))
            .collect();
        let keyword_nodes: Vec<(String, NodeId)> = kwargs
            .into_iter()
            .map(|(name, arg)| (name, self.gather_with_site(&site, arg)))
            .collect();

        let call = self.graph.add_node(Node::Call(Call {
            callable: callable.clone(),
            scope: self.current_scope(),
            site: Some(site),
        }));
        for (index, argument) in argument_nodes.into_iter().enumerate() {
            self.graph.add_edge(argument, call, EdgeKey::Positional(index));
        }
        for (index, (name, argument)) in keyword_nodes.into_iter().enumerate() {
            self.graph
                .add_edge(argument, call, EdgeKey::Keyword(name, index));
        }
        Ok(call)
    }

    ///
    /// Adds a literal value to this plan. Wrapping an existing node is an
    /// error; a node is already symbolic.
    ///
    pub fn lit<T: Send + Sync + 'static>(&mut self, v: T) -> Result<NodeId, PlanError> {
        if TypeId::of::<T>() == TypeId::of::<NodeId>() {
            return Err(PlanError::AlreadyANode);
        }
        Ok(self.lit_value(value::new(v)))
    }

    fn lit_value(&mut self, value: Value) -> NodeId {
        self.graph.add_node(Node::Literal(Literal {
            value,
            scope: self.current_scope(),
        }))
    }

    ///
    /// Gathers a structured value that may contain nodes into a single node
    /// representing the entire structured value.
    ///
    /// Only the four structural container shapes are traversed; a container
    /// with no nodes inside stays a plain value.
    ///
    #[track_caller]
    pub fn gather(&mut self, v: SymVal) -> NodeId {
        let site = CallSite::capture("gather");
        self.gather_with_site(&site, v)
    }

    fn gather_with_site(&mut self, site: &CallSite, v: SymVal) -> NodeId {
        match self.gather_value(site, v) {
            Gathered::Node(id) => id,
            Gathered::Plain(value) => self.lit_value(value),
        }
    }

    fn gather_value(&mut self, site: &CallSite, v: SymVal) -> Gathered {
        match v {
            SymVal::Node(id) => Gathered::Node(id),
            SymVal::Value(value) => Gathered::Plain(value),
            SymVal::List(items) => {
                self.gather_items(site, items, builtins::gather_list(), Composite::List)
            }
            SymVal::Tuple(items) => {
                self.gather_items(site, items, builtins::gather_tuple(), Composite::Tuple)
            }
            SymVal::Set(items) => {
                self.gather_items(site, items, builtins::gather_set(), Composite::Set)
            }
            SymVal::Mapping(pairs) => self.gather_mapping(site, pairs),
        }
    }

    fn gather_items(
        &mut self,
        site: &CallSite,
        items: Vec<SymVal>,
        gatherer: Callable,
        reconstruct: fn(Vec<Value>) -> Composite,
    ) -> Gathered {
        let children: Vec<Gathered> = items
            .into_iter()
            .map(|item| self.gather_value(site, item))
            .collect();
        if children.iter().any(|child| matches!(child, Gathered::Node(..))) {
            let args = children
                .into_iter()
                .map(|child| match child {
                    Gathered::Node(id) => SymVal::Node(id),
                    Gathered::Plain(value) => SymVal::Value(value),
                })
                .collect();
            let call = self
                .call_with_site(site.clone(), &gatherer, args, Vec::new())
                .expect("gather builtins accept any arguments");
            Gathered::Node(call)
        } else {
            let values = children
                .into_iter()
                .map(|child| match child {
                    Gathered::Plain(value) => value,
                    Gathered::Node(..) => unreachable!(),
                })
                .collect();
            Gathered::Plain(value::new(reconstruct(values)))
        }
    }

    fn gather_mapping(&mut self, site: &CallSite, pairs: Vec<(SymVal, SymVal)>) -> Gathered {
        let children: Vec<(Gathered, Gathered)> = pairs
            .into_iter()
            .map(|(key, val)| (self.gather_value(site, key), self.gather_value(site, val)))
            .collect();
        let any_node = children.iter().any(|(key, val)| {
            matches!(key, Gathered::Node(..)) || matches!(val, Gathered::Node(..))
        });
        if any_node {
            let args = children
                .into_iter()
                .map(|(key, val)| {
                    let as_sym = |child| match child {
                        Gathered::Node(id) => SymVal::Node(id),
                        Gathered::Plain(value) => SymVal::Value(value),
                    };
                    SymVal::Tuple(vec![as_sym(key), as_sym(val)])
                })
                .collect();
            let call = self
                .call_with_site(site.clone(), &builtins::gather_mapping(), args, Vec::new())
                .expect("gather builtins accept any arguments");
            Gathered::Node(call)
        } else {
            let value_pairs = children
                .into_iter()
                .map(|(key, val)| match (key, val) {
                    (Gathered::Plain(key), Gathered::Plain(val)) => (key, val),
                    _ => unreachable!(),
                })
                .collect();
            Gathered::Plain(value::new(Composite::Mapping(value_pairs)))
        }
    }

    ///
    /// Unpacks a symbolic iterable with a known length into one node per
    /// element, via a length-checking `unpack` call and an index selector
    /// call per element.
    ///
    #[track_caller]
    pub fn unpack(&mut self, iterable: SymVal, length: usize) -> Result<Vec<NodeId>, PlanError> {
        let site = CallSite::capture("unpack");
        let tuple = self.call_with_site(
            site.clone(),
            &builtins::unpack(),
            vec![iterable, SymVal::of(length)],
            Vec::new(),
        )?;
        (0..length)
            .map(|index| {
                self.call_with_site(
                    site.clone(),
                    &builtins::getitem(),
                    vec![SymVal::Node(tuple), SymVal::of(index)],
                    Vec::new(),
                )
            })
            .collect()
    }

    ///
    /// Adds a dependency indicating that `source` must run before `target`.
    /// Both nodes must already belong to this plan.
    ///
    pub fn add_dependency(&mut self, source: NodeId, target: NodeId) -> Result<(), PlanError> {
        for id in [source, target] {
            if !self.graph.contains(id) {
                return Err(PlanError::NodeNotInPlan(id));
            }
        }
        self.graph.add_edge(source, target, EdgeKey::Dependency);
        Ok(())
    }

    ///
    /// Extends the current scope for as long as the returned guard lives.
    /// Guards are re-entrant and must be dropped in stack order; dropping
    /// them out of order panics.
    ///
    #[must_use = "the scope is restored when the guard is dropped"]
    pub fn scope(&self, tags: impl IntoIterator<Item = Tag>) -> ScopeGuard {
        let mut stack = self.scope.lock();
        let parent_len = stack.len();
        stack.extend(tags);
        ScopeGuard {
            stack: Arc::clone(&self.scope),
            expected: stack.clone(),
            parent_len,
        }
    }
}

impl Default for Plan {
    fn default() -> Plan {
        Plan::new()
    }
}

impl Clone for Plan {
    /// A structural copy of the graph. The copy starts with an empty scope.
    fn clone(&self) -> Plan {
        Plan {
            graph: self.graph.clone(),
            scope: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

///
/// Restores a plan's scope on drop.
///
pub struct ScopeGuard {
    stack: Arc<Mutex<Vec<Tag>>>,
    expected: Vec<Tag>,
    parent_len: usize,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let mut stack = self.stack.lock();
        if *stack != self.expected && !std::thread::panicking() {
            panic!("Plan scopes must be entered and exited in stack order.");
        }
        stack.truncate(self.parent_len);
    }
}

#[cfg(test)]
mod tests;
