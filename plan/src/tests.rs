// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use graph::value;
use graph::{func2, CallArgs, Composite, EdgeKey, Signature, Tag};

use crate::{builtins, Plan, PlanError, SymVal};

fn add() -> graph::Callable {
    func2("add", |a: &i64, b: &i64| a + b)
}

#[test]
fn call_adds_argument_edges() {
    let mut plan = Plan::new();
    let x = plan.call(&add(), [SymVal::of(2_i64), SymVal::of(3_i64)]).unwrap();

    assert_eq!(plan.graph.node_count(), 3);
    let (args, kwargs) = plan.graph.argument_nodes(x);
    assert_eq!(args.len(), 2);
    assert!(kwargs.is_empty());
    for arg in args {
        assert!(plan.graph.node(arg).is_literal());
    }
}

#[test]
fn failure_to_bind_does_not_alter_plan() {
    let mut plan = Plan::new();
    for args in [vec![], vec![SymVal::of(1_i64)], vec![
        SymVal::of(1_i64),
        SymVal::of(2_i64),
        SymVal::of(3_i64),
    ]] {
        let result = plan.call(&add(), args);
        assert!(matches!(result, Err(PlanError::Bind { .. })));
    }
    assert_eq!(plan.graph.node_count(), 0);
}

#[test]
fn unknown_keyword_fails_to_bind() {
    let mut plan = Plan::new();
    let result = plan.call_with_kwargs(
        &add(),
        [SymVal::of(1_i64), SymVal::of(2_i64)],
        [("mystery", SymVal::of(3_i64))],
    );
    assert!(matches!(result, Err(PlanError::Bind { .. })));
    assert_eq!(plan.graph.node_count(), 0);
}

#[test]
fn duplicate_keyword_fails_to_bind() {
    let callable = graph::Callable::with_signature(
        "kw",
        Signature::exact(0).with_any_keywords(),
        |_| Ok(value::new(())),
    );
    let mut plan = Plan::new();
    let result = plan.call_with_kwargs(
        &callable,
        [],
        [("a", SymVal::of(1_i64)), ("a", SymVal::of(2_i64))],
    );
    assert!(matches!(result, Err(PlanError::Bind { .. })));
}

#[test]
fn lit_of_node_is_rejected() {
    let mut plan = Plan::new();
    let x = plan.lit(1_i64).unwrap();
    assert!(matches!(plan.lit(x), Err(PlanError::AlreadyANode)));
}

#[test]
fn add_dependency_requires_membership() {
    let mut plan = Plan::new();
    let mut other = Plan::new();
    let x = plan.call(&add(), [SymVal::of(1_i64), SymVal::of(2_i64)]).unwrap();
    let y = plan.call(&add(), [SymVal::Node(x), SymVal::of(4_i64)]).unwrap();
    plan.add_dependency(x, y).unwrap();
    assert!(plan.graph.has_edge(x, y, &EdgeKey::Dependency));

    let foreign = other.lit(5_i64).unwrap();
    let _ = foreign;
    // `other` has one node; an id the target plan never allocated is refused.
    let unallocated = graph::NodeId::new(17);
    assert!(matches!(
        plan.add_dependency(x, unallocated),
        Err(PlanError::NodeNotInPlan(..))
    ));
}

#[test]
fn gather_leaves_plain_containers_alone() {
    let mut plan = Plan::new();
    let gathered = plan.gather(SymVal::List(vec![
        SymVal::of(1_i64),
        SymVal::of(2_i64),
    ]));
    let literal = plan.graph.node(gathered).as_literal().unwrap();
    let composite = value::get::<Composite>(&literal.value).unwrap();
    assert!(matches!(composite, Composite::List(items) if items.len() == 2));
    // No gather call was synthesised.
    assert_eq!(plan.graph.node_count(), 1);
}

#[test]
fn gather_synthesises_calls_for_nested_nodes() {
    let mut plan = Plan::new();
    let x = plan.call(&add(), [SymVal::of(1_i64), SymVal::of(2_i64)]).unwrap();
    let gathered = plan.gather(SymVal::List(vec![
        SymVal::of(0_i64),
        SymVal::Tuple(vec![SymVal::Node(x), SymVal::of(9_i64)]),
    ]));

    let call = plan.graph.node(gathered).as_call().unwrap();
    assert_eq!(call.callable.name(), "gather_list");
    // The nested tuple got its own gather call feeding the outer one.
    let (args, _) = plan.graph.argument_nodes(gathered);
    assert_eq!(args.len(), 2);
    let inner = plan.graph.node(args[1]).as_call().unwrap();
    assert_eq!(inner.callable.name(), "gather_tuple");
}

#[test]
fn gather_mapping_pairs() {
    let mut plan = Plan::new();
    let x = plan.call(&add(), [SymVal::of(1_i64), SymVal::of(2_i64)]).unwrap();
    let gathered = plan.gather(SymVal::Mapping(vec![(
        SymVal::of("result"),
        SymVal::Node(x),
    )]));
    let call = plan.graph.node(gathered).as_call().unwrap();
    assert_eq!(call.callable.name(), "gather_mapping");
}

#[test]
fn unpack_builds_selector_calls() {
    let mut plan = Plan::new();
    let nodes = plan
        .unpack(
            SymVal::List(vec![
                SymVal::of(7_i64),
                SymVal::of(8_i64),
                SymVal::of(9_i64),
            ]),
            3,
        )
        .unwrap();
    assert_eq!(nodes.len(), 3);
    for node in &nodes {
        let call = plan.graph.node(*node).as_call().unwrap();
        assert_eq!(call.callable.name(), "getitem");
    }
}

#[test]
fn unpack_length_is_checked_at_runtime() {
    let unpack = builtins::unpack();
    let items = value::new(Composite::List(vec![value::new(1_i64)]));
    let err = unpack
        .invoke(CallArgs {
            args: vec![items, value::new(3_usize)],
            kwargs: vec![],
        })
        .unwrap_err();
    assert!(err.to_string().contains("not enough values to unpack"));
}

#[test]
fn scopes_nest_and_restore() {
    let mut plan = Plan::new();
    let outer = plan.scope([Tag::from("report")]);
    let x = plan.lit(1_i64).unwrap();
    {
        let inner = plan.scope([Tag::from("daily"), Tag::from(3_i64)]);
        let y = plan.lit(2_i64).unwrap();
        assert_eq!(plan.graph.node(y).scope().len(), 3);
        drop(inner);
    }
    let z = plan.lit(3_i64).unwrap();
    assert_eq!(plan.graph.node(x).scope().len(), 1);
    assert_eq!(plan.graph.node(z).scope().len(), 1);
    drop(outer);
    let done = plan.lit(4_i64).unwrap();
    assert!(plan.graph.node(done).scope().is_empty());
}

#[test]
#[should_panic(expected = "stack order")]
fn out_of_order_scope_exit_panics() {
    let plan = Plan::new();
    let outer = plan.scope([Tag::from("a")]);
    let inner = plan.scope([Tag::from("b")]);
    drop(outer);
    drop(inner);
}

#[test]
fn copy_resets_scope() {
    let plan = Plan::new();
    let guard = plan.scope([Tag::from("a")]);
    let copy = plan.clone();
    assert!(copy.current_scope().is_empty());
    assert_eq!(plan.current_scope().len(), 1);
    drop(guard);
    assert_eq!(copy.graph.node_count(), plan.graph.node_count());
}

#[test]
fn source_sentinel_refuses_to_run() {
    let err = builtins::source()
        .invoke(CallArgs {
            args: vec![],
            kwargs: vec![],
        })
        .unwrap_err();
    assert!(err.to_string().contains("Registry was not passed"));
}
