// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::sync::Arc;

use graph::value;
use graph::{func1, func2, EdgeKey, NodeId};
use plan::{Plan, SymVal};
use progress::NullObserver;
use registry::Registry;
use scheduler::Retry;
use store::Timestamp;
use testutil::TestStore;

use crate::{plan_with_value_stores, prune_plan, prune_source_literals, Barrier};

fn add() -> graph::Callable {
    func2("add", |a: &i64, b: &i64| a + b)
}

fn transform(
    plan: &mut Plan,
    registry: &Registry,
    output_node: Option<NodeId>,
    fresh_time: Option<Timestamp>,
) -> Option<NodeId> {
    plan_with_value_stores(
        plan,
        registry,
        output_node,
        2,
        &Retry::identity(),
        fresh_time,
        &NullObserver,
    )
    .unwrap()
}

#[test]
fn reachability_prune_keeps_output_ancestors() {
    let mut plan = Plan::new();
    let x = plan
        .call(&add(), [SymVal::of(1_i64), SymVal::of(2_i64)])
        .unwrap();
    let _unused = plan
        .call(&add(), [SymVal::of(3_i64), SymVal::of(4_i64)])
        .unwrap();

    prune_plan(&mut plan, &[], Some(x));
    // x and its two argument literals survive; the unused call is gone.
    assert_eq!(plan.graph.node_count(), 3);
    assert!(plan.graph.contains(x));
}

#[test]
fn trivial_literal_prune_synthesises_dependencies() {
    let mut plan = Plan::new();
    let literal = plan.lit(1_i64).unwrap();
    let before = plan.call(&add(), [SymVal::of(1_i64), SymVal::of(2_i64)]).unwrap();
    let after = plan.call(&add(), [SymVal::of(3_i64), SymVal::of(4_i64)]).unwrap();
    plan.add_dependency(before, literal).unwrap();
    plan.add_dependency(literal, after).unwrap();

    prune_plan(&mut plan, &[before, after], None);
    assert!(!plan.graph.contains(literal));
    assert!(plan.graph.has_edge(before, after, &EdgeKey::Dependency));
}

#[test]
fn literal_consumed_as_argument_is_kept() {
    let mut plan = Plan::new();
    let literal = plan.lit(1_i64).unwrap();
    let consumer = plan.call(&func1("id", |v: &i64| *v), [SymVal::Node(literal)]).unwrap();
    prune_plan(&mut plan, &[], Some(consumer));
    assert!(plan.graph.contains(literal));
}

#[test]
fn source_literal_prune_respects_predicate() {
    let mut plan = Plan::new();
    let a = plan.lit(1_i64).unwrap();
    let b = plan.lit(2_i64).unwrap();
    prune_source_literals(&mut plan, Some(&|id| id == a));
    assert!(!plan.graph.contains(a));
    assert!(plan.graph.contains(b));
}

#[test]
fn fresh_store_skips_the_computation() {
    let mut plan = Plan::new();
    let x = plan
        .call(&add(), [SymVal::of(2_i64), SymVal::of(3_i64)])
        .unwrap();
    let store = Arc::new(TestStore::with_value(value::new(5_i64)));
    let mut registry = Registry::new();
    registry.add(x, store.clone()).unwrap();

    let redirected = transform(&mut plan, &registry, Some(x), None);
    let redirected = redirected.unwrap();
    assert_ne!(redirected, x);
    // The computation was pruned: the only call left is the read.
    let call_names: Vec<String> = plan
        .graph
        .node_ids()
        .filter_map(|id| plan.graph.node(id).as_call())
        .map(|call| call.callable.name().to_owned())
        .collect();
    assert_eq!(call_names, vec!["read".to_owned()]);
}

#[test]
fn empty_store_splices_a_write() {
    let mut plan = Plan::new();
    let x = plan
        .call(&add(), [SymVal::of(2_i64), SymVal::of(3_i64)])
        .unwrap();
    let store = Arc::new(TestStore::new());
    let mut registry = Registry::new();
    registry.add(x, store).unwrap();

    transform(&mut plan, &registry, Some(x), None);
    let mut call_names: Vec<&str> = plan
        .graph
        .node_ids()
        .filter_map(|id| plan.graph.node(id).as_call())
        .map(|call| call.callable.name())
        .collect();
    call_names.sort_unstable();
    assert_eq!(call_names, vec!["add", "read", "write"]);

    // The write depends on the computation and the read depends on the write.
    let write = plan
        .graph
        .node_ids()
        .find(|&id| {
            plan.graph
                .node(id)
                .as_call()
                .is_some_and(|call| call.callable.name() == "write")
        })
        .unwrap();
    let read = plan
        .graph
        .node_ids()
        .find(|&id| {
            plan.graph
                .node(id)
                .as_call()
                .is_some_and(|call| call.callable.name() == "read")
        })
        .unwrap();
    assert!(plan.graph.has_edge(x, write, &EdgeKey::Positional(0)));
    assert!(plan.graph.has_edge(write, read, &EdgeKey::Dependency));
}

#[test]
fn fresh_time_forces_a_rewrite() {
    let mut plan = Plan::new();
    let x = plan
        .call(&add(), [SymVal::of(2_i64), SymVal::of(3_i64)])
        .unwrap();
    let store = Arc::new(TestStore::with_value(value::new(5_i64)));
    let modified = store.modified_time().unwrap().to_naive_utc();
    let mut registry = Registry::new();
    registry.add(x, store).unwrap();

    let fresh = Timestamp::Naive(modified + chrono::Duration::seconds(1));
    transform(&mut plan, &registry, Some(x), Some(fresh));
    let has_write = plan
        .graph
        .node_ids()
        .filter_map(|id| plan.graph.node(id).as_call())
        .any(|call| call.callable.name() == "write");
    assert!(has_write);
}

#[test]
fn stale_source_reread_is_ordered_after_upstream_work() {
    let mut plan = Plan::new();
    let upstream = plan
        .call(&func1("refresh", |v: &i64| *v), [SymVal::of(1_i64)])
        .unwrap();
    let mut registry = Registry::new();
    // An empty source store is stale.
    let source = registry.source(&mut plan, Arc::new(TestStore::new()));
    plan.add_dependency(upstream, source).unwrap();
    let consumer = plan
        .call(&func1("use", |v: &i64| *v), [SymVal::Node(source)])
        .unwrap();

    transform(&mut plan, &registry, Some(consumer), None);

    // No write is spliced for a source, but the re-read is still ordered
    // after the upstream work. The barrier that carried that ordering is
    // itself trivially pruned into a direct dependency edge.
    let read = plan
        .graph
        .node_ids()
        .find(|&id| {
            plan.graph
                .node(id)
                .as_call()
                .is_some_and(|call| call.callable.name() == "read")
        })
        .unwrap();
    assert!(plan.graph.has_edge(upstream, read, &EdgeKey::Dependency));
    let has_write = plan
        .graph
        .node_ids()
        .filter_map(|id| plan.graph.node(id).as_call())
        .any(|call| call.callable.name() == "write");
    assert!(!has_write);
    let has_barrier = plan.graph.node_ids().any(|id| {
        plan.graph
            .node(id)
            .as_literal()
            .is_some_and(|literal| value::get::<Barrier>(&literal.value).is_some())
    });
    assert!(!has_barrier);
    // The source placeholder itself was pruned.
    assert!(!plan.graph.contains(source));
}

#[test]
fn unregistered_plan_is_untouched_by_staleness() {
    let mut plan = Plan::new();
    let x = plan
        .call(&add(), [SymVal::of(2_i64), SymVal::of(3_i64)])
        .unwrap();
    let registry = Registry::new();
    let redirected = transform(&mut plan, &registry, Some(x), None);
    assert_eq!(redirected, Some(x));
    assert!(plan.graph.contains(x));
}
