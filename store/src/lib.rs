// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Value stores: durable homes for node outputs.
//!
//! A registry associates plan nodes with value stores; the transformation
//! passes then splice explicit read and write calls into the graph and use
//! modified times to decide which calls can be skipped entirely.

mod file;
mod source;
mod timestamp;

use std::fmt;

use graph::value::{BoxError, Value};

pub use crate::file::{
    get_modified_time, staged_write, BinaryFileStore, JsonFileStore, TextFileStore, TouchFileStore,
};
pub use crate::source::{LiteralSource, ModifiedTimeSource, PathSource};
pub use crate::timestamp::Timestamp;

///
/// The contract between the engine and a durable home for a value.
///
/// `write` must update the store's modified time on success.
/// `get_modified_time` returns `None` to mean "no stored value".
///
pub trait ValueStore: fmt::Debug + Send + Sync {
    /// Reads the stored value. Fails if the store is empty or unreadable.
    fn read(&self) -> Result<Value, BoxError>;

    /// Writes a value to the store.
    fn write(&self, value: &Value) -> Result<(), BoxError>;

    /// The modified time of the stored value, or `None` if there is none.
    fn get_modified_time(&self) -> Result<Option<Timestamp>, BoxError>;
}

#[cfg(test)]
mod tests;
