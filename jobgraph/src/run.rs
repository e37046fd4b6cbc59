// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The run entry points.

use std::error::Error;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;

use fnv::FnvHashMap;
use log::debug;

use graph::value::{BoxError, Value};
use graph::{CallError, HasACycle, Node, NodeId, Scope};
use plan::{Plan, PlanError, SymVal};
use progress::{CompositeObserver, ConsoleObserver, NullObserver, ProgressObserver, Section};
use registry::Registry;
use scheduler::{default_worker_count, MaxErrors, NodeError, Retry, RunGraphError, Scheduler};
use store::Timestamp;
use transform::{plan_with_value_stores, prune_plan};

use crate::physical::run_physical;

/// A transformation applied to the physical plan just before execution.
pub type TransformPhysical =
    Arc<dyn Fn(Plan, Option<NodeId>) -> Result<(Plan, Option<NodeId>), BoxError> + Send + Sync>;

///
/// How to observe progress.
///
#[derive(Clone, Default)]
pub enum ProgressSpec {
    /// No progress reporting.
    #[default]
    Off,
    /// Print throttled progress to the console.
    Console,
    /// Fan events out to the given observers in order.
    Observers(Vec<Arc<dyn ProgressObserver>>),
}

///
/// Options for [`run`] and [`dry_run`].
///
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Worker threads for execution; defaults to `min(32, cores + 4)`.
    pub max_workers: Option<NonZeroUsize>,
    /// Worker threads for the staleness analysis; defaults to `max_workers`.
    pub stale_check_max_workers: Option<NonZeroUsize>,
    /// The error budget; defaults to stopping after the first error.
    pub max_errors: MaxErrors,
    /// How calls (and modified-time probes) are retried.
    pub retry: Retry,
    /// Stored values older than this are considered stale.
    pub fresh_time: Option<Timestamp>,
    pub progress: ProgressSpec,
    pub scheduler: Scheduler,
    /// Applied to the physical plan after transformation, before execution.
    pub transform_physical: Option<TransformPhysical>,
}

///
/// A failure of [`run`] or [`dry_run`].
///
#[derive(Debug)]
pub enum RunError {
    /// Building the output specification failed.
    Plan(PlanError),
    /// The graph contains a cycle.
    Cycle(HasACycle),
    /// A symbolic call failed; the message carries its symbolic traceback.
    Call(CallError),
    /// The `transform_physical` hook failed.
    Transform(BoxError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Plan(error) => error.fmt(f),
            RunError::Cycle(error) => error.fmt(f),
            RunError::Call(error) => error.fmt(f),
            RunError::Transform(error) => {
                write!(f, "The physical-plan transformation failed: {error}")
            }
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RunError::Plan(error) => Some(error),
            RunError::Cycle(error) => Some(error),
            RunError::Call(error) => Some(error),
            RunError::Transform(error) => Some(&**error),
        }
    }
}

impl From<PlanError> for RunError {
    fn from(error: PlanError) -> RunError {
        RunError::Plan(error)
    }
}

fn from_run_graph(error: RunGraphError, plan: &Plan) -> RunError {
    match error {
        RunGraphError::Cycle(cycle) => RunError::Cycle(cycle),
        RunGraphError::Node(node_error) => RunError::Call(into_call_error(node_error, plan)),
    }
}

fn into_call_error(node_error: NodeError, plan: &Plan) -> CallError {
    let (node, cause) = node_error.into_parts();
    match cause.downcast::<CallError>() {
        Ok(call_error) => *call_error,
        Err(cause) => match plan.graph.try_node(node).and_then(Node::as_call) {
            Some(call) => CallError::new(call, Some(cause)),
            None => CallError::from_parts("literal".to_owned(), None, Some(cause)),
        },
    }
}

fn coerce_observer(progress: &ProgressSpec) -> Arc<dyn ProgressObserver> {
    match progress {
        ProgressSpec::Off => Arc::new(NullObserver),
        ProgressSpec::Console => Arc::new(ConsoleObserver::new()),
        ProgressSpec::Observers(observers) => match observers.len() {
            0 => Arc::new(NullObserver),
            1 => Arc::clone(&observers[0]),
            _ => Arc::new(CompositeObserver::new(observers.clone())),
        },
    }
}

/// Stops the observer on every exit path.
struct ObserverGuard<'a>(&'a dyn ProgressObserver);

impl Drop for ObserverGuard<'_> {
    fn drop(&mut self) {
        self.0.stop();
    }
}

fn prepare(
    plan: &Plan,
    output: Option<SymVal>,
    registry: Option<&Registry>,
    options: &RunOptions,
    observer: &dyn ProgressObserver,
) -> Result<(Plan, Option<NodeId>), RunError> {
    let worker_count = options
        .max_workers
        .map_or_else(default_worker_count, NonZeroUsize::get);
    let stale_check_worker_count = options
        .stale_check_max_workers
        .map_or(worker_count, NonZeroUsize::get);

    let mut plan = plan.clone();
    let output_node = output.map(|output| plan.gather(output));
    let mut redirected_output = output_node;

    match registry {
        Some(registry) if !registry.is_empty() => {
            redirected_output = plan_with_value_stores(
                &mut plan,
                registry,
                output_node,
                stale_check_worker_count,
                &options.retry,
                options.fresh_time,
                observer,
            )
            .map_err(|error| from_run_graph(error, &plan))?;
        }
        _ => prune_plan(&mut plan, &[], output_node),
    }

    if let Some(transform_physical) = &options.transform_physical {
        let (transformed, new_output) =
            transform_physical(plan, redirected_output).map_err(RunError::Transform)?;
        plan = transformed;
        redirected_output = new_output;
    }
    Ok((plan, redirected_output))
}

///
/// Runs a plan.
///
/// Returns the value of the requested output, ensures that every value
/// store in the registry is up to date, and — when an error occurs — waits
/// until no calls are in flight and either no calls remain or the error
/// budget is exhausted, then raises the first error.
///
pub fn run(
    plan: &Plan,
    output: Option<SymVal>,
    registry: Option<&Registry>,
    options: &RunOptions,
) -> Result<Option<Value>, RunError> {
    let observer = coerce_observer(&options.progress);
    observer.start();
    let _guard = ObserverGuard(&*observer);

    let (mut plan, redirected_output) = prepare(plan, output, registry, options, &*observer)?;

    let mut totals: FnvHashMap<Scope, usize> = FnvHashMap::default();
    for id in plan.graph.node_ids() {
        if plan.graph.node(id).is_call() {
            *totals
                .entry(plan.graph.node(id).scope().clone())
                .or_default() += 1;
        }
    }
    for (scope, count) in &totals {
        observer.increment_total(Section::Run, scope, *count);
    }

    let worker_count = options
        .max_workers
        .map_or_else(default_worker_count, NonZeroUsize::get);
    debug!(
        "running a physical plan of {} nodes on {} workers",
        plan.graph.node_count(),
        worker_count
    );
    let result = run_physical(
        &mut plan,
        redirected_output,
        worker_count,
        options.max_errors,
        &options.retry,
        options.scheduler,
        &*observer,
    );
    result.map_err(|error| from_run_graph(error, &plan))
}

///
/// Prepares the physical plan a run would execute — staleness analysis,
/// read/write splicing, pruning and the physical transformation — and
/// returns it along with the redirected output node, without executing.
///
pub fn dry_run(
    plan: &Plan,
    output: Option<SymVal>,
    registry: Option<&Registry>,
    options: &RunOptions,
) -> Result<(Plan, Option<NodeId>), RunError> {
    let observer = coerce_observer(&options.progress);
    observer.start();
    let _guard = ObserverGuard(&*observer);
    prepare(plan, output, registry, options, &*observer)
}
