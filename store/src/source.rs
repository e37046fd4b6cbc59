// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Read-only stores used as plan inputs.

use std::fmt;
use std::path::{Path, PathBuf};

use graph::value::{self, BoxError, Value};

use crate::file::get_modified_time;
use crate::timestamp::Timestamp;
use crate::ValueStore;

///
/// A store whose `read` returns the path itself rather than reading any
/// data. Useful when a call wants to open the file on its own terms while
/// still participating in staleness analysis.
///
pub struct PathSource {
    path: PathBuf,
    required: bool,
}

impl PathSource {
    pub fn new(path: impl Into<PathBuf>) -> PathSource {
        PathSource {
            path: path.into(),
            required: true,
        }
    }

    /// When not required, a missing path reports `None` from
    /// `get_modified_time` instead of failing.
    pub fn optional(path: impl Into<PathBuf>) -> PathSource {
        PathSource {
            path: path.into(),
            required: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn probe(&self, required: bool) -> Result<Option<Timestamp>, BoxError> {
        let modified_time = get_modified_time(&self.path);
        if modified_time.is_none() && required {
            return Err(format!(
                "Failed to get modified time of required source path {:?}.",
                self.path
            )
            .into());
        }
        Ok(modified_time)
    }
}

impl ValueStore for PathSource {
    fn read(&self) -> Result<Value, BoxError> {
        if !self.required {
            // An optional path is only checked for existence when actually read.
            self.probe(true)?;
        }
        Ok(value::new(self.path.clone()))
    }

    fn write(&self, _: &Value) -> Result<(), BoxError> {
        Err("PathSource does not support writing".into())
    }

    fn get_modified_time(&self) -> Result<Option<Timestamp>, BoxError> {
        self.probe(self.required)
    }
}

impl fmt::Debug for PathSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathSource({:?}, required={})", self.path, self.required)
    }
}

///
/// A store that returns a fixed value and modified time.
///
pub struct LiteralSource {
    value: Value,
    modified_time: Option<Timestamp>,
}

impl LiteralSource {
    pub fn new(value: Value, modified_time: Option<Timestamp>) -> LiteralSource {
        LiteralSource {
            value,
            modified_time,
        }
    }
}

impl ValueStore for LiteralSource {
    fn read(&self) -> Result<Value, BoxError> {
        Ok(self.value.clone())
    }

    fn write(&self, _: &Value) -> Result<(), BoxError> {
        Err("LiteralSource does not support writing".into())
    }

    fn get_modified_time(&self) -> Result<Option<Timestamp>, BoxError> {
        Ok(self.modified_time)
    }
}

impl fmt::Debug for LiteralSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LiteralSource(modified_time={:?})", self.modified_time)
    }
}

///
/// A store that returns its modified time as its value. Useful for making
/// something refresh on a schedule regardless of whether its inputs changed.
///
#[derive(Debug)]
pub struct ModifiedTimeSource {
    modified_time: Option<Timestamp>,
}

impl ModifiedTimeSource {
    pub fn new(modified_time: Option<Timestamp>) -> ModifiedTimeSource {
        ModifiedTimeSource { modified_time }
    }
}

impl ValueStore for ModifiedTimeSource {
    fn read(&self) -> Result<Value, BoxError> {
        Ok(value::new(self.modified_time))
    }

    fn write(&self, _: &Value) -> Result<(), BoxError> {
        Err("ModifiedTimeSource does not support writing".into())
    }

    fn get_modified_time(&self) -> Result<Option<Timestamp>, BoxError> {
        Ok(self.modified_time)
    }
}
