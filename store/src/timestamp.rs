// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::time::SystemTime;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

///
/// A stored value's modified time.
///
/// Stores may report either naive or zone-aware times; the staleness
/// analyser normalises everything to naive UTC before comparing.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Timestamp {
    Naive(NaiveDateTime),
    Aware(DateTime<FixedOffset>),
}

impl Timestamp {
    /// The current time, already naive UTC.
    pub fn now() -> Timestamp {
        Timestamp::Naive(Utc::now().naive_utc())
    }

    /// Normalises to naive UTC. Naive times are assumed to already be UTC.
    pub fn to_naive_utc(self) -> NaiveDateTime {
        match self {
            Timestamp::Naive(t) => t,
            Timestamp::Aware(t) => t.with_timezone(&Utc).naive_utc(),
        }
    }

    pub fn from_system_time(t: SystemTime) -> Timestamp {
        let aware: DateTime<Utc> = t.into();
        Timestamp::Aware(aware.fixed_offset())
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(t: NaiveDateTime) -> Timestamp {
        Timestamp::Naive(t)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(t: DateTime<Utc>) -> Timestamp {
        Timestamp::Aware(t.fixed_offset())
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(t: DateTime<FixedOffset>) -> Timestamp {
        Timestamp::Aware(t)
    }
}
