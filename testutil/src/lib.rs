// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Test support shared by the workspace's test suites.

use std::fmt;

use parking_lot::Mutex;

use graph::value::{BoxError, Value};
use store::{Timestamp, ValueStore};

#[derive(Default)]
struct TestStoreState {
    value: Option<Value>,
    modified_time: Option<Timestamp>,
    can_read: bool,
    can_write: bool,
    can_get_modified_time: bool,
    read_count: usize,
    write_count: usize,
}

///
/// A value store that gives tests full control over its state: its value and
/// modified time can be set directly, individual operations can be disabled,
/// and reads and writes are counted.
///
pub struct TestStore {
    state: Mutex<TestStoreState>,
}

impl TestStore {
    /// An empty store.
    pub fn new() -> TestStore {
        TestStore {
            state: Mutex::new(TestStoreState {
                can_read: true,
                can_write: true,
                can_get_modified_time: true,
                ..TestStoreState::default()
            }),
        }
    }

    /// A store holding the given value, modified now.
    pub fn with_value(value: Value) -> TestStore {
        TestStore::with_value_at(value, Timestamp::now())
    }

    /// A store holding the given value with the given modified time.
    pub fn with_value_at(value: Value, modified_time: Timestamp) -> TestStore {
        let store = TestStore::new();
        {
            let mut state = store.state.lock();
            state.value = Some(value);
            state.modified_time = Some(modified_time);
        }
        store
    }

    pub fn deny_reads(self) -> TestStore {
        self.state.lock().can_read = false;
        self
    }

    pub fn deny_writes(self) -> TestStore {
        self.state.lock().can_write = false;
        self
    }

    pub fn deny_modified_time(self) -> TestStore {
        self.state.lock().can_get_modified_time = false;
        self
    }

    pub fn read_count(&self) -> usize {
        self.state.lock().read_count
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().write_count
    }

    pub fn modified_time(&self) -> Option<Timestamp> {
        self.state.lock().modified_time
    }

    pub fn value(&self) -> Option<Value> {
        self.state.lock().value.clone()
    }

    /// Empties the store and resets its counters.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.value = None;
        state.modified_time = None;
        state.read_count = 0;
        state.write_count = 0;
    }
}

impl ValueStore for TestStore {
    fn read(&self) -> Result<Value, BoxError> {
        let mut state = self.state.lock();
        if !state.can_read {
            return Err("This test store cannot read.".into());
        }
        state.read_count += 1;
        state
            .value
            .clone()
            .ok_or_else(|| "Failed to read value from empty store.".into())
    }

    fn write(&self, value: &Value) -> Result<(), BoxError> {
        let mut state = self.state.lock();
        if !state.can_write {
            return Err("This test store cannot write.".into());
        }
        state.write_count += 1;
        state.value = Some(value.clone());
        state.modified_time = Some(Timestamp::now());
        Ok(())
    }

    fn get_modified_time(&self) -> Result<Option<Timestamp>, BoxError> {
        let state = self.state.lock();
        if !state.can_get_modified_time {
            return Err("This test store cannot get modified time.".into());
        }
        Ok(state.modified_time)
    }
}

impl fmt::Debug for TestStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        write!(
            f,
            "TestStore(value={}, read_count={}, write_count={})",
            if state.value.is_some() { "present" } else { "empty" },
            state.read_count,
            state.write_count
        )
    }
}

impl Default for TestStore {
    fn default() -> TestStore {
        TestStore::new()
    }
}
