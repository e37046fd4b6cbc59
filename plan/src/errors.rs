// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::error::Error;
use std::fmt;

use graph::NodeId;

///
/// A plan-construction error. Build-time errors are raised immediately and
/// leave the plan unchanged.
///
#[derive(Debug)]
pub enum PlanError {
    /// The given arguments failed to bind to the callable's signature.
    Bind { callable: String, message: String },
    /// `lit` was asked to wrap a value that is already a node.
    AlreadyANode,
    /// The node does not belong to this plan.
    NodeNotInPlan(NodeId),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::Bind { callable, message } => write!(
                f,
                "{callable} is not callable with the given arguments; {message}"
            ),
            PlanError::AlreadyANode => write!(f, "The value is already a node."),
            PlanError::NodeNotInPlan(id) => {
                write!(f, "The plan graph does not contain the node {id:?}.")
            }
        }
    }
}

impl Error for PlanError {}

/// An expected transformation was not applied.
#[derive(Debug)]
pub struct NotTransformedError;

impl fmt::Display for NotTransformedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A source node was created via a Registry, but that Registry was not passed to run."
        )
    }
}

impl Error for NotTransformedError {}
