//! Tagged values and host result coercion
//!
//! [`Value`] is the closed set of primitive kinds exchanged with the host.
//! [`IntoHost`] is the fixed rule table that turns a native method's return
//! value into a host array:
//!
//! - arrays pass through unchanged
//! - `bool` becomes a logical scalar
//! - strings become char arrays
//! - every other supported type goes through a double scalar
//!
//! A return type without an `IntoHost` impl is rejected at compile time.

use super::array::Array;
use std::fmt;

/// Kind tag of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    String,
    Float,
    Int,
    Bool,
    Array,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::Float => "double",
            Self::Int => "integer",
            Self::Bool => "logical",
            Self::Array => "array",
        };
        f.write_str(name)
    }
}

/// A tagged primitive value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Float(f64),
    Int(i64),
    Bool(bool),
    Array(Array),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Float(_) => ValueKind::Float,
            Self::Int(_) => ValueKind::Int,
            Self::Bool(_) => ValueKind::Bool,
            Self::Array(_) => ValueKind::Array,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(value as f64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Array> for Value {
    fn from(value: Array) -> Self {
        Self::Array(value)
    }
}

/// Conversion of a native return value into a host array
///
/// `None` means the method produced no output.
pub trait IntoHost {
    fn into_host(self) -> Option<Array>;
}

impl IntoHost for Array {
    #[inline]
    fn into_host(self) -> Option<Array> {
        Some(self)
    }
}

impl IntoHost for () {
    #[inline]
    fn into_host(self) -> Option<Array> {
        None
    }
}

impl IntoHost for bool {
    #[inline]
    fn into_host(self) -> Option<Array> {
        Some(Array::logical_scalar(self))
    }
}

impl IntoHost for String {
    #[inline]
    fn into_host(self) -> Option<Array> {
        Some(Array::string(self))
    }
}

impl IntoHost for &str {
    #[inline]
    fn into_host(self) -> Option<Array> {
        Some(Array::string(self))
    }
}

impl IntoHost for Value {
    fn into_host(self) -> Option<Array> {
        match self {
            Value::String(s) => s.into_host(),
            Value::Float(v) => v.into_host(),
            Value::Int(v) => v.into_host(),
            Value::Bool(v) => v.into_host(),
            Value::Array(a) => a.into_host(),
        }
    }
}

/// `None` becomes the empty array so the caller still gets an output
impl<T: IntoHost> IntoHost for Option<T> {
    fn into_host(self) -> Option<Array> {
        Some(self.and_then(IntoHost::into_host).unwrap_or_else(Array::empty))
    }
}

macro_rules! numeric_into_host {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoHost for $ty {
                #[inline]
                fn into_host(self) -> Option<Array> {
                    Some(Array::double_scalar(self as f64))
                }
            }
        )*
    };
}

numeric_into_host!(f64, f32, i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);
