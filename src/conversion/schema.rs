//! Message schemas - the introspection side of conversion
//!
//! A [`MessageDescriptor`] is an immutable, ordered list of field
//! descriptors. Nested message fields hold the nested descriptor behind an
//! `Arc`, so a schema is a tree shared by every message of that type.

use super::message::{FieldValue, Message};
use crate::core::NumericClass;
use crate::errors::{BridgeError, BridgeResult};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Fixed-width numeric leaf types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericType {
    Bool,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
}

impl NumericType {
    /// Host numeric class; `None` for booleans, which map to logical arrays
    pub const fn host_class(self) -> Option<NumericClass> {
        match self {
            Self::Bool => None,
            Self::Int8 => Some(NumericClass::Int8),
            Self::UInt8 => Some(NumericClass::UInt8),
            Self::Int16 => Some(NumericClass::Int16),
            Self::UInt16 => Some(NumericClass::UInt16),
            Self::Int32 => Some(NumericClass::Int32),
            Self::UInt32 => Some(NumericClass::UInt32),
            Self::Int64 => Some(NumericClass::Int64),
            Self::UInt64 => Some(NumericClass::UInt64),
            Self::Float32 => Some(NumericClass::Single),
            Self::Float64 => Some(NumericClass::Double),
        }
    }

    #[inline]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    #[inline]
    pub const fn is_unsigned(self) -> bool {
        matches!(self, Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64)
    }

    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Parse a type name such as `int32` or `float64`
    pub fn parse(name: &str) -> Option<Self> {
        let parsed = match name {
            "bool" => Self::Bool,
            "int8" | "byte" => Self::Int8,
            "uint8" | "char" => Self::UInt8,
            "int16" => Self::Int16,
            "uint16" => Self::UInt16,
            "int32" => Self::Int32,
            "uint32" => Self::UInt32,
            "int64" => Self::Int64,
            "uint64" => Self::UInt64,
            "float32" => Self::Float32,
            "float64" => Self::Float64,
            _ => return None,
        };
        Some(parsed)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }
}

/// Leaf or nested type of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Numeric(NumericType),
    String,
    Time,
    Duration,
    Message(Arc<MessageDescriptor>),
}

impl FieldType {
    /// Resolve a type name: a builtin, or a message type known to `registry`
    pub fn parse(name: &str, registry: &TypeRegistry) -> Option<FieldType> {
        match name {
            "string" => Some(Self::String),
            "time" => Some(Self::Time),
            "duration" => Some(Self::Duration),
            _ => NumericType::parse(name)
                .map(Self::Numeric)
                .or_else(|| registry.get(name).map(Self::Message)),
        }
    }

    /// Whether values of this type appear in the double-matrix view
    pub fn is_numeric_leaf(&self) -> bool {
        matches!(self, Self::Numeric(_) | Self::Time | Self::Duration)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(t) => f.write_str(t.name()),
            Self::String => f.write_str("string"),
            Self::Time => f.write_str("time"),
            Self::Duration => f.write_str("duration"),
            Self::Message(d) => f.write_str(d.name()),
        }
    }
}

/// Longest fixed-length array a type spec may declare
pub const MAX_FIXED_LEN: usize = 1 << 16;

/// How many values a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Single,
    /// Fixed-length array
    Fixed(usize),
    /// Variable-length array
    Repeated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    field_type: FieldType,
    arity: Arity,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            arity: Arity::Single,
        }
    }

    pub fn numeric(name: impl Into<String>, numeric: NumericType) -> Self {
        Self::new(name, FieldType::Numeric(numeric))
    }

    pub fn message(name: impl Into<String>, descriptor: Arc<MessageDescriptor>) -> Self {
        Self::new(name, FieldType::Message(descriptor))
    }

    /// Field from a type spec: `float64`, `string[]`, `pkg/Point[3]`
    pub fn parse(name: impl Into<String>, spec: &str, registry: &TypeRegistry) -> BridgeResult<Self> {
        let spec = spec.trim();
        let (base, arity) = match spec.strip_suffix(']').and_then(|s| s.rsplit_once('[')) {
            None => (spec, Arity::Single),
            Some((base, "")) => (base, Arity::Repeated),
            Some((base, len)) => {
                let len = len
                    .parse::<usize>()
                    .ok()
                    .filter(|&len| len <= MAX_FIXED_LEN)
                    .ok_or_else(|| {
                        BridgeError::InvalidArgument(format!(
                            "invalid array length in '{}' (at most {})",
                            spec, MAX_FIXED_LEN
                        ))
                    })?;
                (base, Arity::Fixed(len))
            }
        };

        let field_type = FieldType::parse(base, registry)
            .ok_or_else(|| BridgeError::InvalidArgument(format!("unknown field type '{}'", base)))?;

        Ok(Self {
            name: name.into(),
            field_type,
            arity,
        })
    }

    /// Make this a fixed-length array of `len` values
    pub fn fixed(mut self, len: usize) -> Self {
        self.arity = Arity::Fixed(len);
        self
    }

    /// Make this a variable-length array
    pub fn repeated(mut self) -> Self {
        self.arity = Arity::Repeated;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    #[inline]
    pub fn arity(&self) -> Arity {
        self.arity
    }

    pub fn is_array(&self) -> bool {
        self.arity != Arity::Single
    }

    pub fn is_message(&self) -> bool {
        matches!(self.field_type, FieldType::Message(_))
    }

    /// Nested descriptor of a message field
    pub fn nested(&self) -> Option<&Arc<MessageDescriptor>> {
        match &self.field_type {
            FieldType::Message(d) => Some(d),
            _ => None,
        }
    }

    /// Columns this field occupies in the double-matrix view
    ///
    /// Strings and variable-length arrays have no fixed width and take none.
    pub fn numeric_width(&self) -> usize {
        let count = match self.arity {
            Arity::Single => 1,
            Arity::Fixed(n) => n,
            Arity::Repeated => return 0,
        };

        match &self.field_type {
            FieldType::String => 0,
            FieldType::Message(d) => count.checked_mul(d.numeric_width()).unwrap_or(usize::MAX),
            _ => count,
        }
    }

    /// Default value for this field, as a freshly instantiated message holds it
    pub fn default_value(&self) -> FieldValue {
        FieldValue::default_for(self)
    }
}

/// Host-visible output shape of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputShape {
    #[default]
    #[serde(rename = "struct")]
    Struct,
    #[serde(rename = "double")]
    DoubleMatrix,
}

impl OutputShape {
    /// Parse a `format` option value
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "struct" => Some(Self::Struct),
            "double" | "matrix" => Some(Self::DoubleMatrix),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::DoubleMatrix => "double",
        }
    }
}

/// Schema of one message type
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDescriptor {
    name: String,
    fields: Vec<FieldDescriptor>,
    preferred_shape: OutputShape,
}

impl MessageDescriptor {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
            preferred_shape: OutputShape::Struct,
        }
    }

    /// Shape `to_matlab` produces when no `format` option is given
    pub fn with_preferred_shape(mut self, shape: OutputShape) -> Self {
        self.preferred_shape = shape;
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Type name, `package/Type`
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[inline]
    pub fn preferred_shape(&self) -> OutputShape {
        self.preferred_shape
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Width of one row in the double-matrix view
    pub fn numeric_width(&self) -> usize {
        self.fields
            .iter()
            .map(FieldDescriptor::numeric_width)
            .fold(0, usize::saturating_add)
    }

    /// A default-valued message of this type
    pub fn instantiate(self: &Arc<Self>) -> Message {
        Message::new(Arc::clone(self))
    }
}

/// Global type registry, created on first use
static TYPES: Lazy<TypeRegistry> = Lazy::new(TypeRegistry::new);

/// Message types by name
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: DashMap<String, Arc<MessageDescriptor>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self { types: DashMap::new() }
    }

    /// The process-wide registry
    pub fn global() -> &'static TypeRegistry {
        &TYPES
    }

    /// Register a descriptor under its name; a later registration replaces it
    pub fn register(&self, descriptor: MessageDescriptor) -> Arc<MessageDescriptor> {
        let descriptor = Arc::new(descriptor);
        self.insert(Arc::clone(&descriptor));
        descriptor
    }

    pub fn insert(&self, descriptor: Arc<MessageDescriptor>) {
        self.types.insert(descriptor.name().to_string(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<Arc<MessageDescriptor>> {
        self.types.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered type names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
