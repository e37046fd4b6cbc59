// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Callables that the planner splices into graphs. They are ordinary
//! callables and remain visible in the graph.

use graph::value::{self, Value};
use graph::{Callable, Composite, Signature};

use crate::errors::NotTransformedError;

/// Reconstructs a list from its gathered items.
pub fn gather_list() -> Callable {
    Callable::with_signature("gather_list", Signature::variadic(), |args| {
        Ok(value::new(Composite::List(args.args)))
    })
}

/// Reconstructs a tuple from its gathered items.
pub fn gather_tuple() -> Callable {
    Callable::with_signature("gather_tuple", Signature::variadic(), |args| {
        Ok(value::new(Composite::Tuple(args.args)))
    })
}

///
/// Reconstructs a set from its gathered items. Erased values are not
/// equatable, so insertion order is preserved and no deduplication occurs.
///
pub fn gather_set() -> Callable {
    Callable::with_signature("gather_set", Signature::variadic(), |args| {
        Ok(value::new(Composite::Set(args.args)))
    })
}

/// Reconstructs a mapping from gathered `(key, value)` pairs.
pub fn gather_mapping() -> Callable {
    Callable::with_signature("gather_mapping", Signature::variadic(), |args| {
        let mut pairs = Vec::with_capacity(args.args.len());
        for arg in &args.args {
            let pair = value::get::<Composite>(arg)
                .and_then(|composite| match composite {
                    Composite::Tuple(items) if items.len() == 2 => {
                        Some((items[0].clone(), items[1].clone()))
                    }
                    _ => None,
                })
                .ok_or("gather_mapping requires two-item tuples as arguments")?;
            pairs.push(pair);
        }
        Ok(value::new(Composite::Mapping(pairs)))
    })
}

fn sequence_items(iterable: &Value) -> Result<Vec<Value>, graph::BoxError> {
    if let Some(composite) = value::get::<Composite>(iterable) {
        return Ok(composite.items());
    }
    if let Some(items) = value::get::<Vec<Value>>(iterable) {
        return Ok(items.clone());
    }
    Err("the value cannot be unpacked; it is not a gatherable container".into())
}

///
/// Checks that the iterable has exactly the expected number of values and
/// returns them as a tuple.
///
pub fn unpack() -> Callable {
    Callable::with_signature("unpack", Signature::exact(2), |args| {
        let items = sequence_items(&args.args[0])?;
        let length = *args.positional::<usize>(1)?;
        if items.len() < length {
            return Err(format!(
                "not enough values to unpack (expected {length}, got {})",
                items.len()
            )
            .into());
        }
        if items.len() > length {
            return Err(format!("too many values to unpack (expected {length})").into());
        }
        Ok(value::new(Composite::Tuple(items)))
    })
}

/// Selects a single value out of an unpacked tuple.
pub fn getitem() -> Callable {
    Callable::with_signature("getitem", Signature::exact(2), |args| {
        let items = sequence_items(&args.args[0])?;
        let index = *args.positional::<usize>(1)?;
        items
            .get(index)
            .cloned()
            .ok_or_else(|| format!("index {index} out of range (len {})", items.len()).into())
    })
}

///
/// The placeholder callable behind registry source nodes.
///
/// If this is ever actually invoked, a node was added to a plan via
/// `Registry::source` but the registry was not supplied to `run`.
///
pub fn source() -> Callable {
    Callable::with_signature("source", Signature::exact(0), |_| {
        Err(Box::new(NotTransformedError))
    })
}
