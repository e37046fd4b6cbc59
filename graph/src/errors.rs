// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::error::Error;
use std::fmt;

use crate::node::Call;
use crate::site::{render_symbolic_traceback, CallSite};
use crate::value::BoxError;

/// The graph contains a cycle. Raised by the topological sort and by the
/// acyclicity check that runs before execution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HasACycle;

impl fmt::Display for HasACycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "The graph contains a cycle.")
    }
}

impl Error for HasACycle {}

///
/// An error was raised in a symbolic call.
///
/// The message carries the call's symbolic traceback; the original error
/// remains accessible through [`Error::source`].
///
#[derive(Debug)]
pub struct CallError {
    name: String,
    site: Option<CallSite>,
    cause: Option<BoxError>,
}

impl CallError {
    pub fn new(call: &Call, cause: Option<BoxError>) -> CallError {
        CallError {
            name: call.callable.name().to_owned(),
            site: call.site.clone(),
            cause,
        }
    }

    pub fn from_parts(name: String, site: Option<CallSite>, cause: Option<BoxError>) -> CallError {
        CallError { name, site, cause }
    }

    /// The name of the failing callable.
    pub fn callable_name(&self) -> &str {
        &self.name
    }

    /// The call's plan-construction site, if one was captured.
    pub fn site(&self) -> Option<&CallSite> {
        self.site.as_ref()
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "An error was raised in a symbolic call to {}.", self.name)?;
        if let Some(site) = &self.site {
            write!(f, "\n{}", render_symbolic_traceback(site))?;
        }
        Ok(())
    }
}

impl Error for CallError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| &**cause as &(dyn Error + 'static))
    }
}
