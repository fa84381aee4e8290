//! Message conversion
//!
//! Schema-driven conversion between typed messages and host arrays.

pub mod engine;
pub mod message;
pub mod schema;
pub mod time;

pub use engine::Conversion;
pub use message::{FieldValue, Leaf, Message};
pub use schema::{
    Arity, FieldDescriptor, FieldType, MessageDescriptor, NumericType, OutputShape, TypeRegistry,
};
pub use time::{Duration, Time};

#[cfg(test)]
mod tests;
