// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Symbolic tracebacks.
//!
//! A plan is built long before it runs, so the native backtrace of an
//! execution failure points at the worker pool rather than at the user's
//! code. Each call node therefore records the source location where it was
//! added to the plan; on failure the chain of recorded locations is rendered
//! as the error message.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// The maximum number of frames kept in a symbolic traceback chain.
pub const MAX_SYMBOLIC_DEPTH: usize = 15;

///
/// A single captured plan-construction frame: the source location of a plan
/// operation, optionally chained to the frame of the enclosing operation.
///
#[derive(Clone, Debug)]
pub struct CallSite {
    /// The plan operation that captured this frame, e.g. `call` or `gather`.
    pub name: &'static str,
    pub path: &'static str,
    pub line: u32,
    pub outer: Option<Arc<Frame>>,
}

/// A link in a symbolic traceback chain.
#[derive(Clone, Debug)]
pub enum Frame {
    Site(CallSite),
    /// Marks that the chain was cut at [`MAX_SYMBOLIC_DEPTH`].
    Truncated,
}

impl CallSite {
    /// Captures the caller's source location.
    #[track_caller]
    pub fn capture(name: &'static str) -> CallSite {
        let location = Location::caller();
        CallSite {
            name,
            path: location.file(),
            line: location.line(),
            outer: None,
        }
    }

    /// Returns this frame chained under `outer`, truncating the combined
    /// chain at [`MAX_SYMBOLIC_DEPTH`].
    pub fn chained(&self, outer: &CallSite) -> CallSite {
        CallSite {
            name: self.name,
            path: self.path,
            line: self.line,
            outer: Some(Arc::new(outer.clone_limited(MAX_SYMBOLIC_DEPTH - 1))),
        }
    }

    fn clone_limited(&self, remaining: usize) -> Frame {
        if remaining == 0 {
            return Frame::Truncated;
        }
        let outer = self.outer.as_ref().map(|frame| {
            Arc::new(match &**frame {
                Frame::Truncated => Frame::Truncated,
                Frame::Site(site) => site.clone_limited(remaining - 1),
            })
        });
        Frame::Site(CallSite {
            name: self.name,
            path: self.path,
            line: self.line,
            outer,
        })
    }

    /// The number of frames in this chain, excluding a truncation marker.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut outer = self.outer.as_deref();
        while let Some(Frame::Site(site)) = outer {
            depth += 1;
            outer = site.outer.as_deref();
        }
        depth
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  File \"{}\", line {}, in {}",
            self.path, self.line, self.name
        )
    }
}

///
/// Renders a symbolic traceback chain in the same shape as a native
/// traceback: outermost frame first, most recent call last.
///
pub fn render_symbolic_traceback(site: &CallSite) -> String {
    let mut lines = Vec::new();
    collect_frames(site, &mut lines);
    lines.reverse();
    let mut rendered = String::from("Symbolic traceback (most recent call last):");
    for line in lines {
        rendered.push('\n');
        rendered.push_str(&line);
    }
    rendered
}

fn collect_frames(site: &CallSite, lines: &mut Vec<String>) {
    lines.push(site.to_string());
    match site.outer.as_deref() {
        None => {}
        Some(Frame::Truncated) => lines.push("  ... truncated".to_owned()),
        Some(Frame::Site(outer)) => collect_frames(outer, lines),
    }
}
