//! Host/native bridge
//!
//! Native objects live behind opaque handles; a host environment drives them
//! through one dispatch entry point (`handle, method, args...`). Messages are
//! converted to and from host arrays by a schema-driven conversion engine.

// Core modules
pub mod core;
pub mod errors;
pub mod options;
pub mod object;
pub mod conversion;
pub mod classes;
pub mod infrastructure;
pub mod bindings;

// Re-export commonly used items
pub use core::{Array, ArrayData, IntoHost, NumericClass, Value, ValueKind};
pub use errors::{BridgeError, BridgeResult};
pub use options::Options;
pub use object::{
    call, dispatch, registry, Dispatched, MethodTable, NativeClass, ObjectRegistry, Outputs, Token,
};
pub use conversion::{
    Conversion, FieldDescriptor, FieldType, Message, MessageDescriptor, NumericType, OutputShape,
    TypeRegistry,
};
pub use classes::MessageObject;
pub use infrastructure::{BridgeConfig, LogConfig};

/// Initialize logging from the loaded configuration (first call wins)
pub fn init() {
    infrastructure::init_with_config(BridgeConfig::global().log_config());
}
