// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Progress observation for running plans.
//!
//! The engine emits typed events against `(section, scope)` pairs; observers
//! turn them into whatever surface they like. Event methods are called from
//! worker threads and must be thread-safe.

mod console;

use std::fmt;
use std::sync::Arc;

use graph::{CallError, Scope};

pub use crate::console::ConsoleObserver;

/// The phase an event belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    /// The staleness analysis.
    Stale,
    /// Physical execution.
    Run,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Stale => write!(f, "stale"),
            Section::Run => write!(f, "run"),
        }
    }
}

///
/// Receives progress events from a single run.
///
/// `start` is called before any event and `stop` after the last one; the
/// engine guarantees `stop` on all exit paths. Observers are single-use.
///
pub trait ProgressObserver: Send + Sync {
    fn start(&self) {}

    fn stop(&self) {}

    /// Adds `amount` expected entries to this section and scope.
    fn increment_total(&self, section: Section, scope: &Scope, amount: usize);

    /// One entry in this section and scope started running.
    fn increment_running(&self, section: Section, scope: &Scope);

    /// One running entry completed.
    fn increment_completed(&self, section: Section, scope: &Scope);

    /// One running entry failed.
    fn increment_failed(&self, section: Section, scope: &Scope, error: &CallError);
}

/// An observer that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl ProgressObserver for NullObserver {
    fn increment_total(&self, _: Section, _: &Scope, _: usize) {}

    fn increment_running(&self, _: Section, _: &Scope) {}

    fn increment_completed(&self, _: Section, _: &Scope) {}

    fn increment_failed(&self, _: Section, _: &Scope, _: &CallError) {}
}

///
/// Fans every event out to its members in registration order.
///
pub struct CompositeObserver {
    members: Vec<Arc<dyn ProgressObserver>>,
}

impl CompositeObserver {
    pub fn new(members: Vec<Arc<dyn ProgressObserver>>) -> CompositeObserver {
        CompositeObserver { members }
    }
}

impl ProgressObserver for CompositeObserver {
    fn start(&self) {
        for member in &self.members {
            member.start();
        }
    }

    fn stop(&self) {
        for member in &self.members {
            member.stop();
        }
    }

    fn increment_total(&self, section: Section, scope: &Scope, amount: usize) {
        for member in &self.members {
            member.increment_total(section, scope, amount);
        }
    }

    fn increment_running(&self, section: Section, scope: &Scope) {
        for member in &self.members {
            member.increment_running(section, scope);
        }
    }

    fn increment_completed(&self, section: Section, scope: &Scope) {
        for member in &self.members {
            member.increment_completed(section, scope);
        }
    }

    fn increment_failed(&self, section: Section, scope: &Scope, error: &CallError) {
        for member in &self.members {
            member.increment_failed(section, scope, error);
        }
    }
}

#[cfg(test)]
mod tests;
