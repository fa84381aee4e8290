//! Message objects - conversion exposed through the dispatch surface
//!
//! Host usage, with `h` the handle returned by "create":
//!
//! ```text
//! h = message(0, 'create', 'geometry/Point', 'format', 'double')
//! s = message(h, 'toStruct')
//! message(h, 'fromMatlab', s, 0)
//! message(h, 'set', 'x', 1.5)
//! [x, y] = message(h, 'get', 'x', 'y')
//! message(h, 'delete')
//! ```

use crate::conversion::{Conversion, Message, MessageDescriptor, TypeRegistry};
use crate::core::Array;
use crate::errors::{BridgeError, BridgeResult};
use crate::infrastructure::BridgeConfig;
use crate::object::{MethodTable, NativeClass, Outputs};
use crate::options::Options;
use std::sync::Arc;

/// A message instance bound to its converter
#[derive(Debug, Clone)]
pub struct MessageObject {
    conversion: Conversion,
}

impl MessageObject {
    /// Wrap a default-valued message of type `descriptor`
    pub fn new(descriptor: &Arc<MessageDescriptor>) -> Self {
        Self::from_message(descriptor.instantiate())
    }

    pub fn from_message(message: Message) -> Self {
        Self {
            conversion: Conversion::new(message),
        }
    }

    pub fn conversion(&self) -> &Conversion {
        &self.conversion
    }

    pub fn conversion_mut(&mut self) -> &mut Conversion {
        &mut self.conversion
    }

    pub fn message(&self) -> Option<&Message> {
        self.conversion.message()
    }

    pub fn type_name(&self) -> &str {
        self.conversion.descriptor().name()
    }

    /// Update the message from element `index` of `source`
    pub fn from_matlab(&mut self, source: &Array, index: usize) -> BridgeResult<()> {
        let mut message = match self.conversion.message() {
            Some(message) => message.clone(),
            None => self.conversion.descriptor().instantiate(),
        };
        self.conversion.from_matlab_into(&mut message, source, index)?;
        self.conversion.set_message(message);
        Ok(())
    }

    /// Host values of the named fields, one output each
    fn get_fields(&self, outputs: &mut Outputs, inputs: &[Array]) -> BridgeResult<()> {
        let descriptor = Arc::clone(self.conversion.descriptor());
        for (index, input) in inputs.iter().enumerate() {
            let name = input.as_string().ok_or_else(|| {
                BridgeError::InvalidArgument(format!("field name expected, got {}", input))
            })?;
            let field = descriptor.field(name).ok_or_else(|| no_such_field(&descriptor, name))?;
            outputs.set(index, self.conversion.convert_to_matlab(field)?)?;
        }
        Ok(())
    }

    /// Update fields from name/value pairs; unknown names are unused arguments
    fn set_fields(&mut self, inputs: &[Array]) -> BridgeResult<()> {
        let values = Options::from_args(inputs, false);
        let descriptor = Arc::clone(self.conversion.descriptor());
        let mut message = match self.conversion.message() {
            Some(message) => message.clone(),
            None => descriptor.instantiate(),
        };

        for field in descriptor.fields() {
            let Some(source) = values.get_array(field.name()) else {
                continue;
            };
            let value = self.conversion.convert_from_matlab(field, source)?;
            message.set(field.name(), value)?;
        }

        values.check_unused(BridgeConfig::global().options.strict)?;
        self.conversion.set_message(message);
        Ok(())
    }
}

fn no_such_field(descriptor: &MessageDescriptor, name: &str) -> BridgeError {
    BridgeError::InvalidArgument(format!(
        "message type {} has no field '{}'",
        descriptor.name(),
        name
    ))
}

/// Optional 0-based index argument
fn index_argument(inputs: &[Array], position: usize) -> BridgeResult<usize> {
    match inputs.get(position) {
        None => Ok(0),
        Some(value) if value.is_scalar() && value.is_numeric() => {
            let index = value.double_scalar_value();
            if index >= 0.0 && index.fract() == 0.0 {
                Ok(index as usize)
            } else {
                Err(BridgeError::InvalidArgument(format!("invalid index {}", index)))
            }
        }
        Some(other) => Err(BridgeError::InvalidArgument(format!(
            "index must be a numeric scalar, got {}",
            other
        ))),
    }
}

fn source_argument(inputs: &[Array]) -> BridgeResult<&Array> {
    inputs.first().ok_or(BridgeError::ArgumentCount { required: 1, found: 0 })
}

impl NativeClass for MessageObject {
    const CLASS_NAME: &'static str = "mexbridge.Message";

    /// `create(type, options...)`
    fn create(inputs: &[Array]) -> BridgeResult<Self> {
        let type_name = inputs
            .first()
            .and_then(Array::as_string)
            .ok_or_else(|| BridgeError::InvalidArgument("message type name expected".to_string()))?;

        let descriptor = TypeRegistry::global().get(type_name).ok_or_else(|| {
            BridgeError::InvalidArgument(format!("unknown message type '{}'", type_name))
        })?;

        let mut object = Self::new(&descriptor);
        object.conversion.set_options(&inputs[1..]);
        Ok(object)
    }

    fn register_methods(methods: &mut MethodTable<Self>) {
        methods
            .niladic("getType", |m: &mut MessageObject| Ok(m.type_name().to_string()))
            .niladic("toMatlab", |m: &mut MessageObject| m.conversion.to_matlab())
            .niladic("toStruct", |m: &mut MessageObject| m.conversion.to_struct())
            .niladic("toDoubleMatrix", |m: &mut MessageObject| m.conversion.to_double_matrix())
            .niladic("expand", |m: &mut MessageObject| {
                let expanded = m.conversion.expanded()?.to_vec();
                Conversion::to_struct_batch(&expanded)
            })
            .with_inputs("fromMatlab", |m: &mut MessageObject, inputs: &[Array]| {
                let source = source_argument(inputs)?;
                let index = index_argument(inputs, 1)?;
                m.from_matlab(source, index)
            })
            .with_inputs("numberOfInstances", |m: &mut MessageObject, inputs: &[Array]| {
                let source = source_argument(inputs)?;
                Ok(m.conversion.number_of_instances(source))
            })
            .with_inputs("setOptions", |m: &mut MessageObject, inputs: &[Array]| {
                m.conversion.set_options(inputs);
                Ok(())
            })
            .with_inputs("set", |m: &mut MessageObject, inputs: &[Array]| m.set_fields(inputs))
            .full("get", |m: &mut MessageObject, outputs: &mut Outputs, inputs: &[Array]| {
                m.get_fields(outputs, inputs)
            });
    }
}
