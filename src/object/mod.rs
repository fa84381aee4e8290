//! Native objects exposed to the host
//!
//! A native class implements [`NativeClass`]; its instances live in the
//! [`registry`](registry::registry) and are reached from the host through
//! [`dispatch`](dispatch::dispatch), which routes named calls through the
//! class's [`MethodTable`].

pub mod dispatch;
pub mod methods;
pub mod registry;

pub use dispatch::{call, dispatch, dispatch_with, method_table, Dispatched};
pub use methods::{CallShape, Method, MethodTable, Outputs, DEFAULT_METHOD};
pub use registry::{registry, token_from_host, Object, ObjectRegistry, Token, HANDLE_FIELD};

use crate::core::Array;
use crate::errors::BridgeResult;

/// A native type the host can create, call and delete
pub trait NativeClass: Send + Sized + 'static {
    /// Host-side wrapper class name
    const CLASS_NAME: &'static str;

    /// Construct an instance from the arguments following "create"
    fn create(inputs: &[Array]) -> BridgeResult<Self>;

    /// Fill the class's method table; called once per process
    fn register_methods(_methods: &mut MethodTable<Self>) {}
}
