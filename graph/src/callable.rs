// Copyright 2026 Jobgraph project contributors (see CONTRIBUTORS.md).
// Licensed under the Apache License, Version 2.0 (see LICENSE).

//! Erased user callables.
//!
//! Dynamic call binding is replaced with an erased closure over positional
//! and keyword argument values, plus a separately stored signature descriptor
//! that plan construction uses for best-effort bind checks.

use std::fmt;
use std::sync::Arc;

use crate::value::{self, BoxError, Value};

/// The argument values for one invocation of a [`Callable`].
pub struct CallArgs {
    pub args: Vec<Value>,
    pub kwargs: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn positional<T: 'static>(&self, index: usize) -> Result<&T, BoxError> {
        let arg = self
            .args
            .get(index)
            .ok_or_else(|| format!("missing positional argument {index}"))?;
        value::get::<T>(arg)
            .ok_or_else(|| format!("positional argument {index} has an unexpected type").into())
    }

    pub fn keyword<T: 'static>(&self, name: &str) -> Result<&T, BoxError> {
        let (_, arg) = self
            .kwargs
            .iter()
            .find(|(kwarg_name, _)| kwarg_name == name)
            .ok_or_else(|| format!("missing keyword argument '{name}'"))?;
        value::get::<T>(arg)
            .ok_or_else(|| format!("keyword argument '{name}' has an unexpected type").into())
    }
}

///
/// A callable's shape, used to validate argument binding when a call is added
/// to a plan. A callable without a signature accepts any arguments.
///
#[derive(Clone, Debug, Default)]
pub struct Signature {
    required: usize,
    optional: usize,
    variadic: bool,
    keywords: Vec<String>,
    any_keywords: bool,
}

impl Signature {
    /// Exactly `n` positional arguments, no keywords.
    pub fn exact(n: usize) -> Signature {
        Signature {
            required: n,
            ..Signature::default()
        }
    }

    /// Any number of positional arguments, no keywords.
    pub fn variadic() -> Signature {
        Signature {
            variadic: true,
            ..Signature::default()
        }
    }

    /// Allows up to `n` additional optional positional arguments.
    pub fn with_optional(mut self, n: usize) -> Signature {
        self.optional = n;
        self
    }

    /// Allows the given keyword argument names.
    pub fn with_keywords(mut self, names: &[&str]) -> Signature {
        self.keywords = names.iter().map(|name| (*name).to_owned()).collect();
        self
    }

    /// Allows arbitrary keyword argument names.
    pub fn with_any_keywords(mut self) -> Signature {
        self.any_keywords = true;
        self
    }

    ///
    /// Checks that `positional` positional arguments and the given keyword
    /// names bind to this signature.
    ///
    pub fn check_bind(&self, positional: usize, keywords: &[&str]) -> Result<(), String> {
        if positional < self.required {
            return Err(format!(
                "missing positional arguments: expected at least {}, got {}",
                self.required, positional
            ));
        }
        if !self.variadic && positional > self.required + self.optional {
            return Err(format!(
                "too many positional arguments: expected at most {}, got {}",
                self.required + self.optional,
                positional
            ));
        }
        for (index, name) in keywords.iter().enumerate() {
            if keywords[..index].contains(name) {
                return Err(format!("duplicate keyword argument '{name}'"));
            }
            if !self.any_keywords && !self.keywords.iter().any(|known| known == name) {
                return Err(format!("unexpected keyword argument '{name}'"));
            }
        }
        Ok(())
    }
}

type CallFn = dyn Fn(CallArgs) -> Result<Value, BoxError> + Send + Sync;

struct Inner {
    name: String,
    signature: Option<Signature>,
    f: Box<CallFn>,
}

///
/// A named, cheaply clonable erased function. This is what a call node in
/// the graph refers to.
///
#[derive(Clone)]
pub struct Callable {
    inner: Arc<Inner>,
}

impl Callable {
    /// A callable with no signature; bind checks are skipped.
    pub fn new<F>(name: impl Into<String>, f: F) -> Callable
    where
        F: Fn(CallArgs) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Callable {
            inner: Arc::new(Inner {
                name: name.into(),
                signature: None,
                f: Box::new(f),
            }),
        }
    }

    pub fn with_signature<F>(name: impl Into<String>, signature: Signature, f: F) -> Callable
    where
        F: Fn(CallArgs) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Callable {
            inner: Arc::new(Inner {
                name: name.into(),
                signature: Some(signature),
                f: Box::new(f),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.inner.signature.as_ref()
    }

    pub fn invoke(&self, args: CallArgs) -> Result<Value, BoxError> {
        (self.inner.f)(args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.inner.name)
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.name)
    }
}

/// A nullary callable from a plain function.
pub fn func0<R, F>(name: &str, f: F) -> Callable
where
    R: Send + Sync + 'static,
    F: Fn() -> R + Send + Sync + 'static,
{
    Callable::with_signature(name, Signature::exact(0), move |_| Ok(value::new(f())))
}

/// A unary callable from a plain function.
pub fn func1<A, R, F>(name: &str, f: F) -> Callable
where
    A: 'static,
    R: Send + Sync + 'static,
    F: Fn(&A) -> R + Send + Sync + 'static,
{
    Callable::with_signature(name, Signature::exact(1), move |args| {
        Ok(value::new(f(args.positional::<A>(0)?)))
    })
}

/// A binary callable from a plain function.
pub fn func2<A, B, R, F>(name: &str, f: F) -> Callable
where
    A: 'static,
    B: 'static,
    R: Send + Sync + 'static,
    F: Fn(&A, &B) -> R + Send + Sync + 'static,
{
    Callable::with_signature(name, Signature::exact(2), move |args| {
        Ok(value::new(f(
            args.positional::<A>(0)?,
            args.positional::<B>(1)?,
        )))
    })
}

/// A ternary callable from a plain function.
pub fn func3<A, B, C, R, F>(name: &str, f: F) -> Callable
where
    A: 'static,
    B: 'static,
    C: 'static,
    R: Send + Sync + 'static,
    F: Fn(&A, &B, &C) -> R + Send + Sync + 'static,
{
    Callable::with_signature(name, Signature::exact(3), move |args| {
        Ok(value::new(f(
            args.positional::<A>(0)?,
            args.positional::<B>(1)?,
            args.positional::<C>(2)?,
        )))
    })
}

/// A nullary callable from a fallible function.
pub fn try_func0<R, F>(name: &str, f: F) -> Callable
where
    R: Send + Sync + 'static,
    F: Fn() -> Result<R, BoxError> + Send + Sync + 'static,
{
    Callable::with_signature(name, Signature::exact(0), move |_| Ok(value::new(f()?)))
}

/// A unary callable from a fallible function.
pub fn try_func1<A, R, F>(name: &str, f: F) -> Callable
where
    A: 'static,
    R: Send + Sync + 'static,
    F: Fn(&A) -> Result<R, BoxError> + Send + Sync + 'static,
{
    Callable::with_signature(name, Signature::exact(1), move |args| {
        Ok(value::new(f(args.positional::<A>(0)?)?))
    })
}

/// A binary callable from a fallible function.
pub fn try_func2<A, B, R, F>(name: &str, f: F) -> Callable
where
    A: 'static,
    B: 'static,
    R: Send + Sync + 'static,
    F: Fn(&A, &B) -> Result<R, BoxError> + Send + Sync + 'static,
{
    Callable::with_signature(name, Signature::exact(2), move |args| {
        Ok(value::new(f(
            args.positional::<A>(0)?,
            args.positional::<B>(1)?,
        )?))
    })
}
