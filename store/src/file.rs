// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! File-backed value stores with atomic staged writes.

use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use graph::value::{self, BoxError, Value};

use crate::timestamp::Timestamp;
use crate::ValueStore;

const STAGING_SUFFIX: &str = ".STAGING";

/// The modified time of the path, or `None` if it does not exist or is
/// inaccessible.
pub fn get_modified_time(path: &Path) -> Option<Timestamp> {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .ok()
        .map(Timestamp::from_system_time)
}

fn staging_path(path: &Path) -> PathBuf {
    let mut staged = path.as_os_str().to_owned();
    staged.push(STAGING_SUFFIX);
    PathBuf::from(staged)
}

///
/// Writes a file atomically: the contents are written to a staging path
/// which is renamed over the target on success. If writing fails, the
/// staging file is removed.
///
pub fn staged_write<F>(path: &Path, write_contents: F) -> io::Result<()>
where
    F: FnOnce(&mut fs::File) -> io::Result<()>,
{
    let staging = staging_path(path);
    let written = fs::File::create(&staging).and_then(|mut file| write_contents(&mut file));
    if let Err(error) = written {
        let _ = fs::remove_file(&staging);
        return Err(error);
    }
    fs::rename(&staging, path)
}

///
/// Stores raw bytes in a file.
///
pub struct BinaryFileStore {
    path: PathBuf,
}

impl BinaryFileStore {
    pub fn new(path: impl Into<PathBuf>) -> BinaryFileStore {
        BinaryFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ValueStore for BinaryFileStore {
    fn read(&self) -> Result<Value, BoxError> {
        Ok(value::new(fs::read(&self.path)?))
    }

    fn write(&self, v: &Value) -> Result<(), BoxError> {
        let bytes = value::get::<Vec<u8>>(v).ok_or("BinaryFileStore requires a Vec<u8> value")?;
        staged_write(&self.path, |file| file.write_all(bytes))?;
        Ok(())
    }

    fn get_modified_time(&self) -> Result<Option<Timestamp>, BoxError> {
        Ok(get_modified_time(&self.path))
    }
}

impl fmt::Debug for BinaryFileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BinaryFileStore({:?})", self.path)
    }
}

///
/// Stores a string in a file.
///
pub struct TextFileStore {
    path: PathBuf,
}

impl TextFileStore {
    pub fn new(path: impl Into<PathBuf>) -> TextFileStore {
        TextFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ValueStore for TextFileStore {
    fn read(&self) -> Result<Value, BoxError> {
        Ok(value::new(fs::read_to_string(&self.path)?))
    }

    fn write(&self, v: &Value) -> Result<(), BoxError> {
        let text = value::get::<String>(v).ok_or("TextFileStore requires a String value")?;
        staged_write(&self.path, |file| file.write_all(text.as_bytes()))?;
        Ok(())
    }

    fn get_modified_time(&self) -> Result<Option<Timestamp>, BoxError> {
        Ok(get_modified_time(&self.path))
    }
}

impl fmt::Debug for TextFileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextFileStore({:?})", self.path)
    }
}

///
/// Stores a JSON-serialisable value (`serde_json::Value`) in a file.
///
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> JsonFileStore {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ValueStore for JsonFileStore {
    fn read(&self) -> Result<Value, BoxError> {
        let file = fs::File::open(&self.path)?;
        let parsed: serde_json::Value = serde_json::from_reader(io::BufReader::new(file))?;
        Ok(value::new(parsed))
    }

    fn write(&self, v: &Value) -> Result<(), BoxError> {
        let json =
            value::get::<serde_json::Value>(v).ok_or("JsonFileStore requires a JSON value")?;
        staged_write(&self.path, |file| {
            serde_json::to_writer_pretty(&mut *file, json).map_err(io::Error::from)
        })?;
        Ok(())
    }

    fn get_modified_time(&self) -> Result<Option<Timestamp>, BoxError> {
        Ok(get_modified_time(&self.path))
    }
}

impl fmt::Debug for JsonFileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsonFileStore({:?})", self.path)
    }
}

///
/// A touch file: stores unit. Useful for integrating side effects into a
/// plan so that downstream work re-runs when they re-run.
///
pub struct TouchFileStore {
    path: PathBuf,
}

impl TouchFileStore {
    pub fn new(path: impl Into<PathBuf>) -> TouchFileStore {
        TouchFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ValueStore for TouchFileStore {
    /// Returns unit after checking that the touch file exists and is empty.
    fn read(&self) -> Result<Value, BoxError> {
        let mut file = fs::File::open(&self.path)?;
        let mut buffer = [0_u8; 1];
        if file.read(&mut buffer)? > 0 {
            return Err(format!("The path {:?} exists but is not empty.", self.path).into());
        }
        Ok(value::new(()))
    }

    fn write(&self, v: &Value) -> Result<(), BoxError> {
        if value::get::<()>(v).is_none() {
            return Err("TouchFileStore requires a unit value".into());
        }
        staged_write(&self.path, |_| Ok(()))?;
        Ok(())
    }

    fn get_modified_time(&self) -> Result<Option<Timestamp>, BoxError> {
        Ok(get_modified_time(&self.path))
    }
}

impl fmt::Debug for TouchFileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TouchFileStore({:?})", self.path)
    }
}
