// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! The transformation passes that turn a logical plan into a physical one.

mod caching;
mod pruning;

pub use crate::caching::{plan_with_value_stores, Barrier};
pub use crate::pruning::{prune_plan, prune_source_literals};

#[cfg(test)]
mod tests;
