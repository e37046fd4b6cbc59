// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::num::NonZeroUsize;
use std::sync::Arc;

use graph::value::{BoxError, Value};

/// Decides whether a failure should be retried.
pub type RetryPredicate = Arc<dyn Fn(&BoxError) -> bool + Send + Sync>;

/// A custom retry wrapper around an erased call.
pub type RetryWrapper =
    Arc<dyn Fn(&mut dyn FnMut() -> Result<Value, BoxError>) -> Result<Value, BoxError> + Send + Sync>;

///
/// How calls are retried. Attempts are sequential with no backoff; on final
/// failure the last error is returned. Errors rejected by the predicate
/// surface on first occurrence.
///
#[derive(Clone)]
pub enum Retry {
    Attempts {
        attempts: NonZeroUsize,
        retry_if: Option<RetryPredicate>,
    },
    Custom(RetryWrapper),
}

impl Retry {
    /// A single attempt: no retrying.
    pub fn identity() -> Retry {
        Retry::attempts(NonZeroUsize::MIN)
    }

    /// Up to `attempts` sequential attempts, retrying any error.
    pub fn attempts(attempts: NonZeroUsize) -> Retry {
        Retry::Attempts {
            attempts,
            retry_if: None,
        }
    }

    /// Up to `attempts` sequential attempts, retrying only errors accepted
    /// by the predicate.
    pub fn attempts_if(attempts: NonZeroUsize, retry_if: RetryPredicate) -> Retry {
        Retry::Attempts {
            attempts,
            retry_if: Some(retry_if),
        }
    }

    pub fn run(&self, f: &mut dyn FnMut() -> Result<Value, BoxError>) -> Result<Value, BoxError> {
        match self {
            Retry::Custom(wrapper) => wrapper(f),
            Retry::Attempts { attempts, retry_if } => {
                let attempts = attempts.get();
                let mut attempt = 0;
                loop {
                    attempt += 1;
                    match f() {
                        Ok(value) => return Ok(value),
                        Err(error) => {
                            let is_last = attempt == attempts;
                            let retryable =
                                retry_if.as_ref().map_or(true, |predicate| predicate(&error));
                            if is_last || !retryable {
                                return Err(error);
                            }
                        }
                    }
                }
            }
        }
    }
}

impl Default for Retry {
    fn default() -> Retry {
        Retry::identity()
    }
}

impl std::fmt::Debug for Retry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Retry::Attempts { attempts, retry_if } => f
                .debug_struct("Retry::Attempts")
                .field("attempts", attempts)
                .field("has_predicate", &retry_if.is_some())
                .finish(),
            Retry::Custom(..) => write!(f, "Retry::Custom"),
        }
    }
}
