// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Erased runtime values.
//!
//! Every value that flows along an argument edge is a cheaply clonable,
//! shared, type-erased `Value`. Callables downcast their arguments back to
//! concrete types at dispatch time.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A shared, type-erased runtime value.
pub type Value = Arc<dyn Any + Send + Sync>;

/// A type-erased error. Callables, value stores and retry wrappers all fail
/// with this type so that causes can be chained and downcast.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Wraps a concrete value as a [`Value`].
pub fn new<T: Send + Sync + 'static>(value: T) -> Value {
    Arc::new(value)
}

/// Downcasts a [`Value`] to a concrete type.
pub fn get<T: 'static>(value: &Value) -> Option<&T> {
    value.downcast_ref::<T>()
}

///
/// A structured runtime value produced by the gather builtins.
///
/// These are the only four container shapes the planner will traverse, so
/// they are the only four shapes that can be reconstructed at runtime. `Set`
/// and `Mapping` preserve insertion order and do not deduplicate: erased
/// values are not equatable.
///
#[derive(Clone)]
pub enum Composite {
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Set(Vec<Value>),
    Mapping(Vec<(Value, Value)>),
}

impl Composite {
    pub fn len(&self) -> usize {
        match self {
            Composite::List(items) | Composite::Tuple(items) | Composite::Set(items) => {
                items.len()
            }
            Composite::Mapping(pairs) => pairs.len(),
        }
    }

    /// The container's items in order. Mapping entries are returned as
    /// two-item tuples, matching how they were gathered.
    pub fn items(&self) -> Vec<Value> {
        match self {
            Composite::List(items) | Composite::Tuple(items) | Composite::Set(items) => {
                items.clone()
            }
            Composite::Mapping(pairs) => pairs
                .iter()
                .map(|(k, v)| new(Composite::Tuple(vec![k.clone(), v.clone()])))
                .collect(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Composite::List(..) => "list",
            Composite::Tuple(..) => "tuple",
            Composite::Set(..) => "set",
            Composite::Mapping(..) => "mapping",
        }
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Composite::{}(len={})", self.kind(), self.len())
    }
}
