//! Dispatch entry point - the single host call surface per native class
//!
//! Every host call arrives as `(outputs, [handle, method, args...])`.
//! "create" and "delete" are lifecycle verbs handled here; every other
//! name goes to the class's method table.

use super::methods::{MethodTable, Outputs};
use super::registry::{registry, ObjectRegistry, Token};
use super::NativeClass;
use crate::core::Array;
use crate::errors::{BridgeError, BridgeResult};
use crate::infrastructure::logging::{log_dispatch, log_dispatch_error};
use crate::infrastructure::BridgeConfig;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::sync::Arc;

pub const CREATE: &str = "create";
pub const DELETE: &str = "delete";

/// Method tables, built once per class on first dispatch
static METHOD_TABLES: Lazy<DashMap<TypeId, Arc<dyn Any + Send + Sync>>> = Lazy::new(DashMap::new);

/// The process-wide method table of `T`
pub fn method_table<T: NativeClass>() -> Arc<MethodTable<T>> {
    let id = TypeId::of::<T>();

    if let Some(table) = METHOD_TABLES.get(&id) {
        if let Ok(table) = Arc::clone(table.value()).downcast::<MethodTable<T>>() {
            return table;
        }
    }

    // Build outside the shard lock; registration may touch other classes
    let built: Arc<dyn Any + Send + Sync> = Arc::new(build_table::<T>());

    let stored = Arc::clone(METHOD_TABLES.entry(id).or_insert(built).value());
    stored
        .downcast::<MethodTable<T>>()
        .unwrap_or_else(|_| Arc::new(build_table::<T>()))
}

fn build_table<T: NativeClass>() -> MethodTable<T> {
    let mut table = MethodTable::new(T::CLASS_NAME);
    table.throw_on_unknown(BridgeConfig::global().dispatch.throw_on_unknown);
    T::register_methods(&mut table);
    table
}

/// What a dispatch did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// "create" minted a new object; its handle is in output 0
    Created { token: Token },
    /// "delete" ran (whether or not an object was live)
    Deleted,
    /// A registered method (or "default") ran
    Handled,
    /// No method matched and there is no "default" entry
    Unhandled { method: String },
}

/// Dispatch a host call to class `T` through the global registry
pub fn dispatch<T: NativeClass>(outputs: &mut Outputs, inputs: &[Array]) -> BridgeResult<Dispatched> {
    dispatch_with::<T>(registry(), &method_table::<T>(), outputs, inputs)
}

/// Dispatch against an explicit registry and method table
pub fn dispatch_with<T: NativeClass>(
    registry: &ObjectRegistry,
    table: &MethodTable<T>,
    outputs: &mut Outputs,
    inputs: &[Array],
) -> BridgeResult<Dispatched> {
    let method = inputs
        .get(1)
        .map(Array::string_value)
        .unwrap_or_default();

    let result = run::<T>(registry, table, &method, outputs, inputs);
    if let Err(e) = &result {
        log_dispatch_error(T::CLASS_NAME, &method, &e.to_string());
    }
    result
}

fn run<T: NativeClass>(
    registry: &ObjectRegistry,
    table: &MethodTable<T>,
    method: &str,
    outputs: &mut Outputs,
    inputs: &[Array],
) -> BridgeResult<Dispatched> {
    let Some((handle, rest)) = inputs.split_first() else {
        return Err(BridgeError::ArgumentCount { required: 1, found: 0 });
    };

    let object = registry.resolve::<T>(handle)?;
    let args = rest.get(1..).unwrap_or(&[]);
    log_dispatch(T::CLASS_NAME, method, args.len());

    match method {
        CREATE => {
            if let Some(existing) = &object {
                registry.destroy(existing.token());
            }

            // Construct before minting so a failed create leaves no handle
            let instance = T::create(args)?;
            let created = registry.mint(instance);
            outputs.set(0, created.handle().clone())?;
            Ok(Dispatched::Created { token: created.token() })
        }
        DELETE => {
            if let Some(existing) = object {
                registry.destroy(existing.token());
            }
            Ok(Dispatched::Deleted)
        }
        _ => {
            let object = object.ok_or_else(|| BridgeError::instance_not_found(T::CLASS_NAME))?;
            let mut instance = object.lock();

            if table.invoke(&mut *instance, method, outputs, args)? {
                Ok(Dispatched::Handled)
            } else {
                Ok(Dispatched::Unhandled { method: method.to_string() })
            }
        }
    }
}

/// Call-style wrapper: dispatch and collect the filled outputs
///
/// An unhandled method is an error here, since the caller expects results.
pub fn call<T: NativeClass>(nargout: usize, inputs: &[Array]) -> BridgeResult<Vec<Array>> {
    let mut outputs = Outputs::new(nargout);

    match dispatch::<T>(&mut outputs, inputs)? {
        Dispatched::Unhandled { method } => {
            let table = method_table::<T>();
            Err(BridgeError::unknown_method(&method, T::CLASS_NAME, &table.names()))
        }
        _ => Ok(outputs.into_vec()),
    }
}
