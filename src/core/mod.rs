//! Core value model
//!
//! Host arrays and the tagged values the bridge passes between the host
//! environment and native objects.

pub mod array;
pub mod value;

pub use array::{Array, ArrayData, NumericClass};
pub use value::{IntoHost, Value, ValueKind};
