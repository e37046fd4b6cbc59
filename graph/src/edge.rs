// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::fmt;

///
/// The kind of an edge in a call graph.
///
/// Argument edges carry a value from the predecessor to the call at runtime;
/// dependency edges only enforce ordering. Structural equality and hashing
/// are load-bearing: the multigraph collapses same-key duplicates between
/// the same ordered pair of nodes.
///
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EdgeKey {
    /// A positional argument at the given index.
    Positional(usize),
    /// A keyword argument with the given name; the index preserves the order
    /// in which keyword arguments were written.
    Keyword(String, usize),
    /// An ordering-only dependency.
    Dependency,
}

impl EdgeKey {
    /// True for edges that carry a value at runtime.
    pub fn is_argument(&self) -> bool {
        !matches!(self, EdgeKey::Dependency)
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKey::Positional(index) => write!(f, "arg[{index}]"),
            EdgeKey::Keyword(name, _) => write!(f, "arg[{name}]"),
            EdgeKey::Dependency => write!(f, "dep"),
        }
    }
}
