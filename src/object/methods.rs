//! Method table - dynamically named calls onto statically typed methods
//!
//! Native methods come in three call shapes:
//! - full control: sees the output slots and the raw inputs
//! - input-only: sees the raw inputs, produces one result
//! - niladic: no arguments, produces one result
//!
//! Registration erases each shape into a [`Method`] once, at setup time.
//! Results go through [`IntoHost`] into output slot 0.

use crate::core::{Array, IntoHost};
use crate::errors::{BridgeError, BridgeResult};
use std::collections::HashMap;

/// Fallback entry used for unregistered names
pub const DEFAULT_METHOD: &str = "default";

/// Output slots of one host call
///
/// The host always provides at least one slot, even when it asked for none.
#[derive(Debug, Clone, PartialEq)]
pub struct Outputs {
    requested: usize,
    slots: Vec<Option<Array>>,
}

impl Outputs {
    pub fn new(requested: usize) -> Self {
        Self {
            requested,
            slots: vec![None; requested.max(1)],
        }
    }

    /// Number of outputs the host asked for
    #[inline]
    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn set(&mut self, index: usize, value: Array) -> BridgeResult<()> {
        let capacity = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            BridgeError::InvalidArgument(format!(
                "output {} requested but only {} output(s) available",
                index + 1,
                capacity
            ))
        })?;
        *slot = Some(value);
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Array> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Number of slots filled, counting up to the last filled one
    pub fn filled(&self) -> usize {
        self.slots.iter().rposition(Option::is_some).map_or(0, |i| i + 1)
    }

    /// Filled outputs; gaps before the last filled slot become empty arrays
    pub fn into_vec(self) -> Vec<Array> {
        let filled = self.filled();
        self.slots
            .into_iter()
            .take(filled)
            .map(Option::unwrap_or_default)
            .collect()
    }
}

type FullFn<T> = dyn Fn(&mut T, &mut Outputs, &[Array]) -> BridgeResult<Option<Array>> + Send + Sync;
type InputsFn<T> = dyn Fn(&mut T, &[Array]) -> BridgeResult<Option<Array>> + Send + Sync;
type NiladicFn<T> = dyn Fn(&mut T) -> BridgeResult<Option<Array>> + Send + Sync;

/// Call shape of a registered method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallShape {
    Full,
    Inputs,
    Niladic,
}

/// A type-erased native method
pub enum Method<T> {
    Full(Box<FullFn<T>>),
    Inputs(Box<InputsFn<T>>),
    Niladic(Box<NiladicFn<T>>),
}

impl<T> Method<T> {
    pub fn full<F, R>(f: F) -> Self
    where
        F: Fn(&mut T, &mut Outputs, &[Array]) -> BridgeResult<R> + Send + Sync + 'static,
        R: IntoHost,
    {
        Method::Full(Box::new(move |object, outputs, inputs| {
            f(object, outputs, inputs).map(IntoHost::into_host)
        }))
    }

    pub fn with_inputs<F, R>(f: F) -> Self
    where
        F: Fn(&mut T, &[Array]) -> BridgeResult<R> + Send + Sync + 'static,
        R: IntoHost,
    {
        Method::Inputs(Box::new(move |object, inputs| {
            f(object, inputs).map(IntoHost::into_host)
        }))
    }

    pub fn niladic<F, R>(f: F) -> Self
    where
        F: Fn(&mut T) -> BridgeResult<R> + Send + Sync + 'static,
        R: IntoHost,
    {
        Method::Niladic(Box::new(move |object| f(object).map(IntoHost::into_host)))
    }

    pub fn shape(&self) -> CallShape {
        match self {
            Method::Full(_) => CallShape::Full,
            Method::Inputs(_) => CallShape::Inputs,
            Method::Niladic(_) => CallShape::Niladic,
        }
    }

    pub fn call(&self, object: &mut T, outputs: &mut Outputs, inputs: &[Array]) -> BridgeResult<()> {
        let result = match self {
            Method::Full(f) => f(object, outputs, inputs)?,
            Method::Inputs(f) => f(object, inputs)?,
            Method::Niladic(f) => f(object)?,
        };

        if let Some(value) = result {
            outputs.set(0, value)?;
        }
        Ok(())
    }
}

/// Per-class map from method name to native method
pub struct MethodTable<T> {
    class_name: &'static str,
    methods: HashMap<String, Method<T>>,
    throw_on_unknown: bool,
}

impl<T> MethodTable<T> {
    pub fn new(class_name: &'static str) -> Self {
        Self {
            class_name,
            methods: HashMap::new(),
            throw_on_unknown: false,
        }
    }

    #[inline]
    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    /// Raise on unregistered names instead of trying "default"
    pub fn throw_on_unknown(&mut self, value: bool) -> &mut Self {
        self.throw_on_unknown = value;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.throw_on_unknown
    }

    /// Register `method` under `name`; a later registration replaces it
    pub fn register(&mut self, name: impl Into<String>, method: Method<T>) -> &mut Self {
        self.methods.insert(name.into(), method);
        self
    }

    pub fn full<F, R>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&mut T, &mut Outputs, &[Array]) -> BridgeResult<R> + Send + Sync + 'static,
        R: IntoHost,
    {
        self.register(name, Method::full(f))
    }

    pub fn with_inputs<F, R>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&mut T, &[Array]) -> BridgeResult<R> + Send + Sync + 'static,
        R: IntoHost,
    {
        self.register(name, Method::with_inputs(f))
    }

    pub fn niladic<F, R>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&mut T) -> BridgeResult<R> + Send + Sync + 'static,
        R: IntoHost,
    {
        self.register(name, Method::niladic(f))
    }

    pub fn has(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn shape_of(&self, name: &str) -> Option<CallShape> {
        self.methods.get(name).map(Method::shape)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Invoke `name` on `object`
    ///
    /// Returns `Ok(false)` when nothing handled the call: the name is not
    /// registered, the table is lenient and there is no "default" entry.
    pub fn invoke(
        &self,
        object: &mut T,
        name: &str,
        outputs: &mut Outputs,
        inputs: &[Array],
    ) -> BridgeResult<bool> {
        if let Some(method) = self.methods.get(name) {
            method.call(object, outputs, inputs)?;
            return Ok(true);
        }

        if self.throw_on_unknown {
            return Err(BridgeError::unknown_method(name, self.class_name, &self.names()));
        }

        match self.methods.get(DEFAULT_METHOD) {
            Some(fallback) => {
                fallback.call(object, outputs, inputs)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<T> std::fmt::Debug for MethodTable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodTable")
            .field("class_name", &self.class_name)
            .field("methods", &self.names())
            .field("throw_on_unknown", &self.throw_on_unknown)
            .finish()
    }
}
