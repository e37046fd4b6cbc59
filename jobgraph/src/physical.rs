// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Physical execution: slots, bound calls, and dispatch.
//!
//! Prep creates one result slot per node and one bound call per call node.
//! The slot map is dropped after prep, so the bound calls and the output
//! slot are the only owners of slots; dropping a bound call after its run
//! releases the argument values it held as soon as no other pending call
//! refers to them. That is what keeps peak value liveness low.

use std::sync::Arc;

use fnv::FnvHashMap;
use parking_lot::Mutex;

use graph::value::{BoxError, Value};
use graph::{CallArgs, CallError, Callable, NodeId};
use plan::Plan;
use progress::{ProgressObserver, Section};
use scheduler::{create_queue, run_on_graph, MaxErrors, Retry, RunGraphError, Scheduler};
use transform::prune_source_literals;

struct Slot {
    value: Mutex<Option<Value>>,
}

impl Slot {
    fn new(initial: Option<Value>) -> Arc<Slot> {
        Arc::new(Slot {
            value: Mutex::new(initial),
        })
    }
}

///
/// A call bound to the slots it reads from and writes to.
///
struct BoundCall {
    callable: Callable,
    args: Vec<Arc<Slot>>,
    kwargs: Vec<(String, Arc<Slot>)>,
    result: Arc<Slot>,
}

impl BoundCall {
    fn run(&self, retry: &Retry) -> Result<(), BoxError> {
        let mut invoke = || {
            let args = self
                .args
                .iter()
                .map(|slot| {
                    slot.value
                        .lock()
                        .clone()
                        .expect("argument slots are filled before dispatch")
                })
                .collect();
            let kwargs = self
                .kwargs
                .iter()
                .map(|(name, slot)| {
                    (
                        name.clone(),
                        slot.value
                            .lock()
                            .clone()
                            .expect("argument slots are filled before dispatch"),
                    )
                })
                .collect();
            self.callable.invoke(CallArgs { args, kwargs })
        };
        let result = retry.run(&mut invoke)?;
        *self.result.value.lock() = Some(result);
        Ok(())
    }
}

struct PrepPhysical {
    bound_calls: FnvHashMap<NodeId, Mutex<Option<BoundCall>>>,
    output_slot: Option<Arc<Slot>>,
}

fn prep_physical(plan: &mut Plan, output_node: Option<NodeId>) -> PrepPhysical {
    let mut slots: FnvHashMap<NodeId, Arc<Slot>> = FnvHashMap::default();
    for id in plan.graph.node_ids() {
        let initial = plan
            .graph
            .node(id)
            .as_literal()
            .map(|literal| literal.value.clone());
        slots.insert(id, Slot::new(initial));
    }

    let mut bound_calls = FnvHashMap::default();
    for id in plan.graph.node_ids().collect::<Vec<_>>() {
        let call = match plan.graph.node(id).as_call() {
            None => continue,
            Some(call) => call,
        };
        let (args, kwargs) = plan.graph.argument_nodes(id);
        bound_calls.insert(
            id,
            Mutex::new(Some(BoundCall {
                callable: call.callable.clone(),
                args: args.iter().map(|arg| Arc::clone(&slots[arg])).collect(),
                kwargs: kwargs
                    .into_iter()
                    .map(|(name, arg)| (name, Arc::clone(&slots[&arg])))
                    .collect(),
                result: Arc::clone(&slots[&id]),
            })),
        );
    }
    let output_slot = output_node.map(|id| Arc::clone(&slots[&id]));

    // Literal sources already live in their slots; they have no work to
    // schedule. Literals with predecessors (barriers) stay as no-op nodes.
    prune_source_literals(plan, None);

    PrepPhysical {
        bound_calls,
        output_slot,
    }
}

///
/// Executes a physical plan and returns the value at the output node, if
/// any. Failures are wrapped as `CallError` carrying the failing call's
/// symbolic traceback before they surface from the pool.
///
pub(crate) fn run_physical(
    plan: &mut Plan,
    output_node: Option<NodeId>,
    worker_count: usize,
    max_errors: MaxErrors,
    retry: &Retry,
    scheduler: Scheduler,
    observer: &dyn ProgressObserver,
) -> Result<Option<Value>, RunGraphError> {
    let prep = prep_physical(plan, output_node);
    let graph = &plan.graph;

    let process = |node: NodeId| -> Result<(), BoxError> {
        let call = match graph.node(node).as_call() {
            None => return Ok(()),
            Some(call) => call,
        };
        let scope = call.scope.clone();
        observer.increment_running(Section::Run, &scope);
        let bound = prep.bound_calls[&node]
            .lock()
            .take()
            .expect("a call is dispatched exactly once");
        let result = bound.run(retry);
        // Dropping the bound call releases its argument slots.
        drop(bound);
        match result {
            Ok(()) => {
                observer.increment_completed(Section::Run, &scope);
                Ok(())
            }
            Err(cause) => {
                let call_error = CallError::new(call, Some(cause));
                observer.increment_failed(Section::Run, &scope, &call_error);
                Err(Box::new(call_error))
            }
        }
    };

    let queue = create_queue(graph, scheduler);
    run_on_graph(graph, process, worker_count, max_errors, &queue)?;

    Ok(prep
        .output_slot
        .and_then(|slot| slot.value.lock().clone()))
}
