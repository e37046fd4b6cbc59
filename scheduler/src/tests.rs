// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fnv::FnvHashSet;
use parking_lot::Mutex;

use graph::value::{self, BoxError};
use graph::{func0, CallSite, EdgeKey, Literal, Node, NodeId, PlanGraph, Scope};

use crate::{
    create_queue, get_priorities, run_on_graph, Item, MaxErrors, Retry, RunGraphError, Scheduler,
    WorkQueue,
};

fn literal() -> Node {
    Node::Literal(Literal {
        value: value::new(()),
        scope: Scope::empty(),
    })
}

fn call(name: &str) -> Node {
    Node::Call(graph::Call {
        callable: func0(name, || ()),
        scope: Scope::empty(),
        site: Some(CallSite::capture("call")),
    })
}

#[test]
fn fifo_queue_accounting() {
    let queue = WorkQueue::fifo();
    let a = NodeId::new(0);
    let b = NodeId::new(1);
    queue.put(Item::Node(a));
    queue.put(Item::Node(b));
    assert_eq!(queue.get(), Item::Node(a));
    assert_eq!(queue.get(), Item::Node(b));
    queue.task_done();
    queue.task_done();
    // All items are done, so join returns immediately.
    queue.join();
}

#[test]
fn random_queue_returns_everything() {
    let queue = WorkQueue::random();
    let mut expected = FnvHashSet::default();
    for index in 0..100 {
        let id = NodeId::new(index);
        expected.insert(id);
        queue.put(Item::Node(id));
    }
    let mut seen = FnvHashSet::default();
    for _ in 0..100 {
        match queue.get() {
            Item::Node(id) => {
                seen.insert(id);
            }
            Item::Done => panic!("no sentinel was queued"),
        }
        queue.task_done();
    }
    assert_eq!(seen, expected);
}

#[test]
fn priority_queue_pops_lowest_priority_first() {
    let mut priorities = fnv::FnvHashMap::default();
    let a = NodeId::new(0);
    let b = NodeId::new(1);
    let c = NodeId::new(2);
    priorities.insert(a, 2);
    priorities.insert(b, 0);
    priorities.insert(c, 1);

    let queue = WorkQueue::with_priorities(priorities);
    queue.put(Item::Node(a));
    queue.put(Item::Node(b));
    queue.put(Item::Node(c));
    queue.put(Item::Done);

    // The sentinel has priority -1 and beats all real work.
    assert_eq!(queue.get(), Item::Done);
    assert_eq!(queue.get(), Item::Node(b));
    assert_eq!(queue.get(), Item::Node(c));
    assert_eq!(queue.get(), Item::Node(a));
}

#[test]
fn priorities_cover_every_node_contiguously() {
    // a -> b -> d <- c, plus a dependency-only sink e.
    let mut graph = PlanGraph::new();
    let a = graph.add_node(literal());
    let b = graph.add_node(call("b"));
    let c = graph.add_node(literal());
    let d = graph.add_node(call("d"));
    let e = graph.add_node(call("e"));
    graph.add_edge(a, b, EdgeKey::Positional(0));
    graph.add_edge(b, d, EdgeKey::Positional(0));
    graph.add_edge(c, d, EdgeKey::Positional(1));
    graph.add_edge(d, e, EdgeKey::Dependency);

    let priorities = get_priorities(&graph);
    assert_eq!(priorities.len(), 5);
    let mut seen: Vec<usize> = priorities.values().copied().collect();
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 3, 4]);
}

#[test]
fn independent_chains_get_contiguous_priority_blocks() {
    let mut graph = PlanGraph::new();
    let mut chains = Vec::new();
    for _ in 0..3 {
        let source = graph.add_node(literal());
        let mid = graph.add_node(call("mid"));
        let sink = graph.add_node(call("sink"));
        graph.add_edge(source, mid, EdgeKey::Positional(0));
        graph.add_edge(mid, sink, EdgeKey::Positional(0));
        chains.push(vec![source, mid, sink]);
    }

    let priorities = get_priorities(&graph);
    for chain in chains {
        let mut chain_priorities: Vec<usize> =
            chain.iter().map(|id| priorities[id]).collect();
        chain_priorities.sort_unstable();
        // Each chain occupies an uninterrupted block of the total order.
        assert_eq!(
            chain_priorities[2] - chain_priorities[0],
            2,
            "chain priorities are not contiguous: {chain_priorities:?}"
        );
    }
}

#[test]
fn priorities_are_stable_under_construction_order() {
    // The same three chains assembled in random node and edge insertion
    // orders: the planner walks hash maps and a union-find whose iteration
    // order depends on construction, and its bounds must not.
    use rand::seq::SliceRandom;

    let mut rng = rand::rng();
    for _ in 0..10 {
        let mut graph = PlanGraph::new();
        let mut slots: Vec<(usize, usize)> = (0..3)
            .flat_map(|chain| (0..3).map(move |step| (chain, step)))
            .collect();
        slots.shuffle(&mut rng);
        let mut grid = [[None::<NodeId>; 3]; 3];
        for (chain, step) in slots {
            let node = if step == 0 { literal() } else { call("step") };
            grid[chain][step] = Some(graph.add_node(node));
        }
        let mut edges = Vec::new();
        for chain in &grid {
            for step in 0..2 {
                edges.push((chain[step].unwrap(), chain[step + 1].unwrap()));
            }
        }
        edges.shuffle(&mut rng);
        for (from, to) in edges {
            graph.add_edge(from, to, EdgeKey::Positional(0));
        }

        let priorities = get_priorities(&graph);
        for chain in &grid {
            let mut chain_priorities: Vec<usize> = chain
                .iter()
                .map(|id| priorities[&id.unwrap()])
                .collect();
            chain_priorities.sort_unstable();
            assert_eq!(
                chain_priorities[2] - chain_priorities[0],
                2,
                "chain priorities are not contiguous: {chain_priorities:?}"
            );
        }
    }
}

fn diamond() -> (PlanGraph, Vec<NodeId>) {
    let mut graph = PlanGraph::new();
    let a = graph.add_node(literal());
    let b = graph.add_node(call("b"));
    let c = graph.add_node(call("c"));
    let d = graph.add_node(call("d"));
    graph.add_edge(a, b, EdgeKey::Positional(0));
    graph.add_edge(a, c, EdgeKey::Positional(0));
    graph.add_edge(b, d, EdgeKey::Positional(0));
    graph.add_edge(c, d, EdgeKey::Positional(1));
    (graph, vec![a, b, c, d])
}

#[test]
fn nodes_run_after_their_predecessors() {
    for scheduler in [Scheduler::Cheap, Scheduler::Random, Scheduler::Default] {
        let (graph, _) = diamond();
        let completed: Mutex<FnvHashSet<NodeId>> = Mutex::new(FnvHashSet::default());
        let queue = create_queue(&graph, scheduler);
        run_on_graph(
            &graph,
            |node| {
                {
                    let completed = completed.lock();
                    for predecessor in graph.predecessors(node) {
                        assert!(
                            completed.contains(&predecessor),
                            "{node:?} ran before {predecessor:?}"
                        );
                    }
                }
                completed.lock().insert(node);
                Ok(())
            },
            4,
            MaxErrors::default(),
            &queue,
        )
        .unwrap();
        assert_eq!(completed.into_inner().len(), graph.node_count());
    }
}

#[test]
fn failed_nodes_do_not_release_successors() {
    let (graph, nodes) = diamond();
    let b = nodes[1];
    let d = nodes[3];
    let visited: Mutex<Vec<NodeId>> = Mutex::new(Vec::new());
    let queue = create_queue(&graph, Scheduler::Cheap);
    let result = run_on_graph(
        &graph,
        |node| {
            visited.lock().push(node);
            if node == b {
                return Err("boom".into());
            }
            Ok(())
        },
        1,
        MaxErrors::Unlimited,
        &queue,
    );
    let visited = visited.into_inner();
    assert!(!visited.contains(&d));
    match result {
        Err(RunGraphError::Node(error)) => assert_eq!(error.node, b),
        other => panic!("expected a node error, got {other:?}"),
    }
}

#[test]
fn error_budget_stops_dispatch() {
    // Independent failing sources with a single worker: exactly limit + 1
    // calls are made.
    let mut graph = PlanGraph::new();
    for _ in 0..6 {
        graph.add_node(call("fail"));
    }
    let calls = AtomicUsize::new(0);
    let queue = create_queue(&graph, Scheduler::Cheap);
    let result = run_on_graph(
        &graph,
        |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("boom".into())
        },
        1,
        MaxErrors::Limit(2),
        &queue,
    );
    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn unlimited_budget_runs_everything() {
    let mut graph = PlanGraph::new();
    for _ in 0..6 {
        graph.add_node(call("fail"));
    }
    let calls = AtomicUsize::new(0);
    let queue = create_queue(&graph, Scheduler::Cheap);
    let result = run_on_graph(
        &graph,
        |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("boom".into())
        },
        2,
        MaxErrors::Unlimited,
        &queue,
    );
    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 6);
}

#[test]
fn cycles_are_detected_before_running() {
    let mut graph = PlanGraph::new();
    let a = graph.add_node(call("a"));
    let b = graph.add_node(call("b"));
    graph.add_edge(a, b, EdgeKey::Dependency);
    graph.add_edge(b, a, EdgeKey::Dependency);
    let queue = create_queue(&graph, Scheduler::Cheap);
    let result = run_on_graph(&graph, |_| Ok(()), 1, MaxErrors::default(), &queue);
    assert!(matches!(result, Err(RunGraphError::Cycle(..))));
}

#[test]
fn retry_retries_until_success() {
    let failures_left = AtomicUsize::new(3);
    let calls = AtomicUsize::new(0);
    let retry = Retry::attempts(NonZeroUsize::new(5).unwrap());
    let result = retry.run(&mut || {
        calls.fetch_add(1, Ordering::SeqCst);
        if failures_left.fetch_sub(1, Ordering::SeqCst) > 0 {
            return Err("flaky".into());
        }
        Ok(value::new(7_i64))
    });
    assert_eq!(value::get::<i64>(&result.unwrap()), Some(&7));
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[test]
fn retry_gives_up_after_final_attempt() {
    let calls = AtomicUsize::new(0);
    let retry = Retry::attempts(NonZeroUsize::new(3).unwrap());
    let result = retry.run(&mut || {
        calls.fetch_add(1, Ordering::SeqCst);
        Err("always".into())
    });
    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn retry_predicate_rejects_non_matching_errors() {
    let calls = AtomicUsize::new(0);
    let retry = Retry::attempts_if(
        NonZeroUsize::new(5).unwrap(),
        Arc::new(|error: &BoxError| error.to_string().contains("transient")),
    );
    let result = retry.run(&mut || {
        calls.fetch_add(1, Ordering::SeqCst);
        Err("fatal".into())
    });
    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
