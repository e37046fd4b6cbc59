// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! jobgraph builds and executes symbolic call graphs.
//!
//! A [`Plan`] is a directed multigraph of literal values and deferred calls.
//! [`run`] evaluates every call exactly once in a topological order, moving
//! per-edge values through the graph in parallel, while an optional
//! [`Registry`] of value stores is consulted to skip calls whose previously
//! persisted outputs are still fresh: the graph is the pipeline, the
//! registry is the cache, and the engine is the scheduler.
//!
//! ```
//! use jobgraph::{func2, run, value, Plan, RunOptions, SymVal};
//!
//! let mut plan = Plan::new();
//! let total = plan
//!     .call(&func2("add", |a: &i64, b: &i64| a + b), [
//!         SymVal::of(2_i64),
//!         SymVal::of(3_i64),
//!     ])
//!     .unwrap();
//! let result = run(&plan, Some(SymVal::Node(total)), None, &RunOptions::default()).unwrap();
//! assert_eq!(value::get::<i64>(&result.unwrap()), Some(&5));
//! ```

mod physical;
mod run;

pub use graph::value;
pub use graph::{
    func0, func1, func2, func3, render_symbolic_traceback, try_func0, try_func1, try_func2,
    CallArgs, CallError, CallSite, Callable, Composite, EdgeKey, HasACycle, Node, NodeId,
    PlanGraph, Scope, Signature, Tag, Value,
};
pub use plan::{builtins, NotTransformedError, Plan, PlanError, ScopeGuard, SymVal};
pub use progress::{
    CompositeObserver, ConsoleObserver, NullObserver, ProgressObserver, Section,
};
pub use registry::{DuplicateEntry, Registry, RegistryEntry};
pub use scheduler::{MaxErrors, NodeError, Retry, Scheduler};
pub use store::{Timestamp, ValueStore};
pub use transform::Barrier;

pub use crate::run::{dry_run, run, ProgressSpec, RunError, RunOptions, TransformPhysical};

/// The value-store library.
pub use ::store as stores;
