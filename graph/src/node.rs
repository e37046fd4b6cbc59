// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::fmt;

use petgraph::stable_graph::NodeIndex;

use crate::callable::Callable;
use crate::scope::Scope;
use crate::site::CallSite;
use crate::value::Value;

/// A node's identity: a stable arena index into its plan's graph. Ids remain
/// valid across plan copies and transformations.
pub type NodeId = NodeIndex<u32>;

///
/// A symbolic value in a call graph.
///
#[derive(Clone)]
pub enum Node {
    Literal(Literal),
    Call(Call),
}

/// A symbolic literal value.
#[derive(Clone)]
pub struct Literal {
    pub value: Value,
    pub scope: Scope,
}

/// A symbolic function call.
#[derive(Clone)]
pub struct Call {
    pub callable: Callable,
    pub scope: Scope,
    pub site: Option<CallSite>,
}

impl Node {
    pub fn scope(&self) -> &Scope {
        match self {
            Node::Literal(literal) => &literal.scope,
            Node::Call(call) => &call.scope,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Node::Literal(..))
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Node::Call(..))
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Node::Literal(literal) => Some(literal),
            Node::Call(..) => None,
        }
    }

    pub fn as_call(&self) -> Option<&Call> {
        match self {
            Node::Call(call) => Some(call),
            Node::Literal(..) => None,
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(literal) => f
                .debug_struct("Literal")
                .field("scope", &literal.scope)
                .finish(),
            Node::Call(call) => f
                .debug_struct("Call")
                .field("callable", &call.callable)
                .field("scope", &call.scope)
                .finish(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(..) => write!(f, "literal"),
            Node::Call(call) => write!(f, "call({})", call.callable),
        }
    }
}
