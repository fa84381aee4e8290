//! Message instances
//!
//! A [`Message`] holds one [`FieldValue`] per field of its descriptor, in
//! schema order. Values always match their field's type and arity: the
//! setters refuse anything else.

use super::schema::{Arity, FieldDescriptor, FieldType, MessageDescriptor, NumericType};
use super::time::{Duration, Time};
use crate::errors::{BridgeError, BridgeResult};
use std::sync::Arc;

/// A single leaf value
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Time(Time),
    Duration(Duration),
}

impl Leaf {
    /// Default leaf of a non-message field type
    pub fn default_for(field_type: &FieldType) -> Option<Leaf> {
        match field_type {
            FieldType::Numeric(t) => Some(Self::from_f64(*t, 0.0)),
            FieldType::String => Some(Leaf::String(String::new())),
            FieldType::Time => Some(Leaf::Time(Time::ZERO)),
            FieldType::Duration => Some(Leaf::Duration(Duration::ZERO)),
            FieldType::Message(_) => None,
        }
    }

    /// Numeric leaf of type `t`; out-of-range values saturate, NaN gives 0
    pub fn from_f64(t: NumericType, value: f64) -> Leaf {
        match t {
            NumericType::Bool => Leaf::Bool(value != 0.0 && !value.is_nan()),
            NumericType::Int8 => Leaf::Int(value as i8 as i64),
            NumericType::Int16 => Leaf::Int(value as i16 as i64),
            NumericType::Int32 => Leaf::Int(value as i32 as i64),
            NumericType::Int64 => Leaf::Int(value as i64),
            NumericType::UInt8 => Leaf::UInt(value as u8 as u64),
            NumericType::UInt16 => Leaf::UInt(value as u16 as u64),
            NumericType::UInt32 => Leaf::UInt(value as u32 as u64),
            NumericType::UInt64 => Leaf::UInt(value as u64),
            NumericType::Float32 => Leaf::Float(value as f32 as f64),
            NumericType::Float64 => Leaf::Float(value),
        }
    }

    /// Leaf of a time/duration/numeric field from host seconds or number
    pub fn from_host_number(field_type: &FieldType, value: f64) -> Option<Leaf> {
        match field_type {
            FieldType::Numeric(t) => Some(Self::from_f64(*t, value)),
            FieldType::Time => Some(Leaf::Time(Time::from_sec(value))),
            FieldType::Duration => Some(Leaf::Duration(Duration::from_sec(value))),
            FieldType::String | FieldType::Message(_) => None,
        }
    }

    /// Numeric view; time stamps in seconds, strings have none
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Leaf::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Leaf::Int(v) => Some(*v as f64),
            Leaf::UInt(v) => Some(*v as f64),
            Leaf::Float(v) => Some(*v),
            Leaf::String(_) => None,
            Leaf::Time(t) => Some(t.to_sec()),
            Leaf::Duration(d) => Some(d.to_sec()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Leaf::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this leaf is a valid value of `field_type`
    pub fn matches(&self, field_type: &FieldType) -> bool {
        match (self, field_type) {
            (Leaf::Bool(_), FieldType::Numeric(NumericType::Bool)) => true,
            (Leaf::Int(_), FieldType::Numeric(t)) => t.is_signed(),
            (Leaf::UInt(_), FieldType::Numeric(t)) => t.is_unsigned(),
            (Leaf::Float(_), FieldType::Numeric(t)) => t.is_float(),
            (Leaf::String(_), FieldType::String) => true,
            (Leaf::Time(_), FieldType::Time) => true,
            (Leaf::Duration(_), FieldType::Duration) => true,
            _ => false,
        }
    }
}

impl From<bool> for Leaf {
    fn from(value: bool) -> Self {
        Leaf::Bool(value)
    }
}

impl From<f64> for Leaf {
    fn from(value: f64) -> Self {
        Leaf::Float(value)
    }
}

impl From<i64> for Leaf {
    fn from(value: i64) -> Self {
        Leaf::Int(value)
    }
}

impl From<u64> for Leaf {
    fn from(value: u64) -> Self {
        Leaf::UInt(value)
    }
}

impl From<&str> for Leaf {
    fn from(value: &str) -> Self {
        Leaf::String(value.to_string())
    }
}

impl From<String> for Leaf {
    fn from(value: String) -> Self {
        Leaf::String(value)
    }
}

impl From<Time> for Leaf {
    fn from(value: Time) -> Self {
        Leaf::Time(value)
    }
}

impl From<Duration> for Leaf {
    fn from(value: Duration) -> Self {
        Leaf::Duration(value)
    }
}

/// Value of one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Leaf(Leaf),
    Leaves(Vec<Leaf>),
    Message(Message),
    Messages(Vec<Message>),
}

impl FieldValue {
    /// Default value of `field`: zero leaves, default nested messages,
    /// `n` defaults for fixed arrays and nothing for variable ones
    pub fn default_for(field: &FieldDescriptor) -> FieldValue {
        match (field.field_type(), field.arity()) {
            (FieldType::Message(d), Arity::Single) => FieldValue::Message(d.instantiate()),
            (FieldType::Message(d), Arity::Fixed(n)) => {
                FieldValue::Messages((0..n).map(|_| d.instantiate()).collect())
            }
            (FieldType::Message(_), Arity::Repeated) => FieldValue::Messages(Vec::new()),
            (t, arity) => {
                let leaf = Leaf::default_for(t).unwrap_or(Leaf::Float(0.0));
                match arity {
                    Arity::Single => FieldValue::Leaf(leaf),
                    Arity::Fixed(n) => FieldValue::Leaves(vec![leaf; n]),
                    Arity::Repeated => FieldValue::Leaves(Vec::new()),
                }
            }
        }
    }

    /// Whether this value fits `field`'s type and arity
    pub fn matches(&self, field: &FieldDescriptor) -> bool {
        let arity_ok = |len: usize| match field.arity() {
            Arity::Single => false,
            Arity::Fixed(n) => len == n,
            Arity::Repeated => true,
        };

        match (self, field.field_type()) {
            (FieldValue::Leaf(leaf), t) => field.arity() == Arity::Single && leaf.matches(t),
            (FieldValue::Leaves(leaves), t) => {
                arity_ok(leaves.len()) && leaves.iter().all(|l| l.matches(t))
            }
            (FieldValue::Message(m), FieldType::Message(d)) => {
                field.arity() == Arity::Single && m.type_name() == d.name()
            }
            (FieldValue::Messages(ms), FieldType::Message(d)) => {
                arity_ok(ms.len()) && ms.iter().all(|m| m.type_name() == d.name())
            }
            _ => false,
        }
    }

    pub fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            FieldValue::Leaf(leaf) => Some(leaf),
            _ => None,
        }
    }

    pub fn as_leaves(&self) -> Option<&[Leaf]> {
        match self {
            FieldValue::Leaves(leaves) => Some(leaves),
            _ => None,
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            FieldValue::Message(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_messages(&self) -> Option<&[Message]> {
        match self {
            FieldValue::Messages(ms) => Some(ms),
            _ => None,
        }
    }
}

impl From<Leaf> for FieldValue {
    fn from(leaf: Leaf) -> Self {
        FieldValue::Leaf(leaf)
    }
}

impl From<Vec<Leaf>> for FieldValue {
    fn from(leaves: Vec<Leaf>) -> Self {
        FieldValue::Leaves(leaves)
    }
}

impl From<Message> for FieldValue {
    fn from(message: Message) -> Self {
        FieldValue::Message(message)
    }
}

impl From<Vec<Message>> for FieldValue {
    fn from(messages: Vec<Message>) -> Self {
        FieldValue::Messages(messages)
    }
}

/// An instance of a message type
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    descriptor: Arc<MessageDescriptor>,
    values: Vec<FieldValue>,
}

impl Message {
    /// Default-valued message of type `descriptor`
    pub fn new(descriptor: Arc<MessageDescriptor>) -> Self {
        let values = descriptor.fields().iter().map(FieldValue::default_for).collect();
        Self { descriptor, values }
    }

    #[inline]
    pub fn descriptor(&self) -> &Arc<MessageDescriptor> {
        &self.descriptor
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        self.descriptor.name()
    }

    /// Field descriptors paired with their values, in schema order
    pub fn fields(&self) -> impl Iterator<Item = (&FieldDescriptor, &FieldValue)> {
        self.descriptor.fields().iter().zip(self.values.iter())
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        let index = self.descriptor.field_index(name)?;
        self.values.get(index)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        let index = self.descriptor.field_index(name)?;
        self.values.get_mut(index)
    }

    pub fn value_at(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }

    pub(crate) fn value_at_mut(&mut self, index: usize) -> Option<&mut FieldValue> {
        self.values.get_mut(index)
    }

    /// Replace field `name`; the value must fit the field's type and arity
    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) -> BridgeResult<&mut Self> {
        let value = value.into();
        let index = self.descriptor.field_index(name).ok_or_else(|| {
            BridgeError::InvalidArgument(format!(
                "message type {} has no field '{}'",
                self.descriptor.name(),
                name
            ))
        })?;

        let field = &self.descriptor.fields()[index];
        if !value.matches(field) {
            return Err(BridgeError::InvalidArgument(format!(
                "value does not fit field '{}' of type {}",
                name,
                field.field_type()
            )));
        }

        self.values[index] = value;
        Ok(self)
    }

    /// Leaf of a single-valued field
    pub fn leaf(&self, name: &str) -> Option<&Leaf> {
        self.get(name).and_then(FieldValue::as_leaf)
    }
}
