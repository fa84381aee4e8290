//! Object registry - host handles for native instances
//!
//! Design: the host never sees an address. Each native object is stored in a
//! process-wide table under a fresh integer token, and the host holds that
//! token as a double scalar. Stale or forged tokens miss the table lookup
//! instead of being dereferenced.

use super::NativeClass;
use crate::core::Array;
use crate::errors::{BridgeError, BridgeResult};
use crate::infrastructure::logging::{log_object_created, log_object_destroyed};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, MutexGuard};
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Host-visible object token
pub type Token = u64;

/// Name of the property/field that carries the token on the host side
pub const HANDLE_FIELD: &str = "handle";

/// Global registry, created on first use
static REGISTRY: Lazy<ObjectRegistry> = Lazy::new(ObjectRegistry::new);

/// The process-wide registry
pub fn registry() -> &'static ObjectRegistry {
    &REGISTRY
}

/// Wrapper correlating a token with a shared native instance
pub struct Object<T> {
    token: Token,
    instance: Arc<Mutex<T>>,
    handle: Array,
}

impl<T> Clone for Object<T> {
    fn clone(&self) -> Self {
        Self {
            token: self.token,
            instance: Arc::clone(&self.instance),
            handle: self.handle.clone(),
        }
    }
}

impl<T: NativeClass> Object<T> {
    #[inline]
    pub fn token(&self) -> Token {
        self.token
    }

    /// The persistent host array carrying the token
    #[inline]
    pub fn handle(&self) -> &Array {
        &self.handle
    }

    /// Shared pointer to the instance, for subsystems that outlive a call
    pub fn instance(&self) -> &Arc<Mutex<T>> {
        &self.instance
    }

    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.instance.lock()
    }
}

impl<T> std::fmt::Debug for Object<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object").field("token", &self.token).finish()
    }
}

/// Type-erased registry slot
struct Slot {
    class_name: &'static str,
    object: Box<dyn Any + Send + Sync>,
}

/// Token table
pub struct ObjectRegistry {
    objects: DashMap<Token, Slot>,
    next_token: AtomicU64,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self {
            objects: DashMap::with_capacity(16),
            // token 0 is never live
            next_token: AtomicU64::new(1),
        }
    }

    /// Register a native instance the registry takes ownership of
    pub fn mint<T: NativeClass>(&self, instance: T) -> Object<T> {
        self.mint_shared(Arc::new(Mutex::new(instance)))
    }

    /// Register an instance whose ownership is shared with another subsystem
    pub fn mint_shared<T: NativeClass>(&self, instance: Arc<Mutex<T>>) -> Object<T> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);

        let mut handle = Array::double_scalar(token as f64);
        handle.make_persistent();

        let object = Object { token, instance, handle };
        self.objects.insert(
            token,
            Slot {
                class_name: T::CLASS_NAME,
                object: Box::new(object.clone()),
            },
        );

        log_object_created(T::CLASS_NAME, token);
        object
    }

    /// Resolve a host handle value to a live object of class `T`
    ///
    /// Malformed handles are an error; a well-formed token without a live
    /// object of this class resolves to `None`.
    pub fn resolve<T: NativeClass>(&self, value: &Array) -> BridgeResult<Option<Object<T>>> {
        let token = token_from_host(value, T::CLASS_NAME)?;
        Ok(self.get::<T>(token))
    }

    /// Look up a token directly
    pub fn get<T: NativeClass>(&self, token: Token) -> Option<Object<T>> {
        let slot = self.objects.get(&token)?;
        let object = slot.object.downcast_ref::<Object<T>>();
        if object.is_none() {
            tracing::warn!(
                event = "handle_class_mismatch",
                handle = token,
                expected = T::CLASS_NAME,
                found = slot.class_name,
                "Handle belongs to another class"
            );
        }
        object.cloned()
    }

    /// Release the object behind `token`; returns whether it was live
    ///
    /// The native instance is dropped once no other subsystem holds it.
    pub fn destroy(&self, token: Token) -> bool {
        match self.objects.remove(&token) {
            Some((_, slot)) => {
                log_object_destroyed(slot.class_name, token);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, token: Token) -> bool {
        self.objects.contains_key(&token)
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Drop every object (process teardown)
    pub fn clear(&self) {
        self.objects.clear();
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the token from any of the three host handle shapes: an instance
/// of the wrapper class `class_name`, a struct with a `handle` field, or a
/// bare numeric scalar of any class.
pub fn token_from_host(value: &Array, class_name: &str) -> BridgeResult<Token> {
    let carrier = if value.is_class(class_name) {
        value.property(HANDLE_FIELD)
    } else if value.is_struct() {
        value.field(0, HANDLE_FIELD)
    } else if value.is_numeric() {
        Some(value)
    } else {
        None
    };

    let Some(carrier) = carrier else {
        return Err(BridgeError::InvalidHandle(format!(
            "expected a {} object, a struct with a '{}' field or a number, got {}",
            class_name, HANDLE_FIELD, value
        )));
    };

    let raw = match carrier.numeric_values() {
        Some(values) if !values.is_empty() => values[0],
        _ => {
            return Err(BridgeError::InvalidHandle(format!(
                "handle must be a non-empty number, got {}",
                carrier
            )))
        }
    };

    if !raw.is_finite() || raw < 0.0 || raw.fract() != 0.0 || raw > u64::MAX as f64 {
        return Err(BridgeError::InvalidHandle(format!("{} is not a handle token", raw)));
    }

    Ok(raw as Token)
}
