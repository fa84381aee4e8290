//! Conversion engine - messages to host arrays and back
//!
//! Two host shapes are supported:
//! - struct: one struct element per message, one field per message field,
//!   nested messages as nested structs
//! - double matrix: one row per message, columns are the numeric leaves in
//!   schema order; strings and variable-length arrays are skipped
//!
//! Leaves are read leniently (an unreadable leaf becomes its default);
//! containers are read strictly (a non-struct where a struct is needed is
//! an error).

use super::message::{FieldValue, Leaf, Message};
use super::schema::{Arity, FieldDescriptor, FieldType, MessageDescriptor, OutputShape};
use crate::core::{Array, NumericClass};
use crate::errors::{BridgeError, BridgeResult};
use crate::infrastructure::logging::log_conversion;
use crate::infrastructure::BridgeConfig;
use crate::options::Options;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Options every new conversion starts from
static DEFAULT_OPTIONS: Lazy<Mutex<Options>> = Lazy::new(|| {
    let config = &BridgeConfig::global().conversion;
    let mut options = Options::new();
    if let Some(format) = config.format {
        options.set_string("format", format.name());
    }
    options.set_bool("expand", config.expand);
    Mutex::new(options)
});

/// Converter bound to one message type, and optionally one message
#[derive(Debug, Clone)]
pub struct Conversion {
    descriptor: Arc<MessageDescriptor>,
    message: Option<Message>,
    expanded: Option<Vec<Message>>,
    options: Options,
}

impl Conversion {
    /// Converter for `message` with the process-wide default options
    pub fn new(message: Message) -> Self {
        Self::with_options(message, Self::default_options().clone())
    }

    pub fn with_options(message: Message, options: Options) -> Self {
        Self {
            descriptor: Arc::clone(message.descriptor()),
            message: Some(message),
            expanded: None,
            options,
        }
    }

    /// Converter for reading messages of type `descriptor` from host arrays
    pub fn for_type(descriptor: Arc<MessageDescriptor>) -> Self {
        Self {
            descriptor,
            message: None,
            expanded: None,
            options: Self::default_options().clone(),
        }
    }

    /// Process-wide default options, seeded from the `[conversion]` config
    pub fn default_options() -> MutexGuard<'static, Options> {
        DEFAULT_OPTIONS.lock()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// Merge host-supplied option arguments onto this conversion's options
    pub fn set_options(&mut self, inputs: &[Array]) -> &mut Self {
        let lowercase = BridgeConfig::global().options.lowercase_keys;
        self.options.merge(&Options::from_args(inputs, lowercase));
        self.expanded = None;
        self
    }

    #[inline]
    pub fn descriptor(&self) -> &Arc<MessageDescriptor> {
        &self.descriptor
    }

    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    /// Replace the bound message
    pub fn set_message(&mut self, message: Message) {
        self.descriptor = Arc::clone(message.descriptor());
        self.message = Some(message);
        self.expanded = None;
    }

    pub fn into_message(self) -> Option<Message> {
        self.message
    }

    fn bound(&self) -> BridgeResult<&Message> {
        self.message.as_ref().ok_or_else(|| {
            BridgeError::Conversion(format!("no {} message to convert", self.descriptor.name()))
        })
    }

    /// Shape selected by the `format` option, else the type's preference
    pub fn output_shape(&self) -> OutputShape {
        let format = self.options.get_string("format", "");
        OutputShape::parse(&format).unwrap_or_else(|| self.descriptor.preferred_shape())
    }

    fn expand_requested(&self) -> bool {
        self.options.get_bool("expand", false)
    }

    // ------------------------------------------------------------------
    // Message to host
    // ------------------------------------------------------------------

    /// Convert the bound message in its preferred or requested shape
    pub fn to_matlab(&mut self) -> BridgeResult<Array> {
        match self.output_shape() {
            OutputShape::Struct => self.to_struct(),
            OutputShape::DoubleMatrix => self.to_double_matrix(),
        }
    }

    /// Write into element/row `index` of `target`, preallocating `size`
    pub fn to_matlab_into(&mut self, target: &mut Array, index: usize, size: usize) -> BridgeResult<()> {
        match self.output_shape() {
            OutputShape::Struct => self.to_struct_into(target, index, size),
            OutputShape::DoubleMatrix => self.to_double_matrix_into(target, index, size),
        }
    }

    /// 1x1 struct, or 1xN when expansion is on
    pub fn to_struct(&mut self) -> BridgeResult<Array> {
        let mut target = Array::empty();
        if self.expand_requested() {
            let instances = self.expanded()?.to_vec();
            for (index, message) in instances.iter().enumerate() {
                write_struct(message, &mut target, index, instances.len())?;
            }
            log_conversion(self.descriptor.name(), "struct", instances.len());
        } else {
            self.to_struct_into(&mut target, 0, 1)?;
        }
        Ok(target)
    }

    /// Write the bound message into struct element `index` of `target`
    ///
    /// An empty target becomes a struct array of `size` elements; other
    /// elements of an existing struct array are left untouched.
    pub fn to_struct_into(&self, target: &mut Array, index: usize, size: usize) -> BridgeResult<()> {
        let message = self.bound()?;
        write_struct(message, target, index, size)?;
        log_conversion(message.type_name(), "struct", 1);
        Ok(())
    }

    /// 1xW row, or NxW when expansion is on
    pub fn to_double_matrix(&mut self) -> BridgeResult<Array> {
        let mut target = Array::empty();
        if self.expand_requested() {
            let instances = self.expanded()?.to_vec();
            for (index, message) in instances.iter().enumerate() {
                write_row(message, &mut target, index, instances.len())?;
            }
            log_conversion(self.descriptor.name(), "double", instances.len());
        } else {
            self.to_double_matrix_into(&mut target, 0, 1)?;
        }
        Ok(target)
    }

    /// Write the bound message into row `index` of `target`
    ///
    /// An empty target becomes a `size` x W zero matrix.
    pub fn to_double_matrix_into(&self, target: &mut Array, index: usize, size: usize) -> BridgeResult<()> {
        let message = self.bound()?;
        write_row(message, target, index, size)?;
        log_conversion(message.type_name(), "double", 1);
        Ok(())
    }

    /// Struct array with one element per message
    pub fn to_struct_batch(messages: &[Message]) -> BridgeResult<Array> {
        let mut target = Array::empty();
        for (index, message) in messages.iter().enumerate() {
            write_struct(message, &mut target, index, messages.len())?;
        }
        if let Some(first) = messages.first() {
            log_conversion(first.type_name(), "struct", messages.len());
        }
        Ok(target)
    }

    /// Double matrix with one row per message
    pub fn to_double_matrix_batch(messages: &[Message]) -> BridgeResult<Array> {
        let mut target = Array::empty();
        for (index, message) in messages.iter().enumerate() {
            write_row(message, &mut target, index, messages.len())?;
        }
        if let Some(first) = messages.first() {
            log_conversion(first.type_name(), "double", messages.len());
        }
        Ok(target)
    }

    /// Host value of one field of the bound message
    pub fn convert_to_matlab(&self, field: &FieldDescriptor) -> BridgeResult<Array> {
        let message = self.bound()?;
        let value = message.get(field.name()).ok_or_else(|| {
            BridgeError::Conversion(format!(
                "message type {} has no field '{}'",
                message.type_name(),
                field.name()
            ))
        })?;
        field_to_host(field, value)
    }

    /// The bound message split into one message per combination of
    /// elements of its variable-length nested message arrays
    ///
    /// Each expanded message carries at most one element in each of those
    /// arrays; empty arrays stay empty. Fixed-length arrays keep all their
    /// elements and leaf arrays are not split.
    pub fn expanded(&mut self) -> BridgeResult<&[Message]> {
        if self.expanded.is_none() {
            let expanded = expand(self.bound()?);
            self.expanded = Some(expanded);
        }
        Ok(self.expanded.as_deref().unwrap_or(&[]))
    }

    // ------------------------------------------------------------------
    // Host to message
    // ------------------------------------------------------------------

    /// Number of messages `source` encodes: struct elements or matrix rows
    pub fn number_of_instances(&self, source: &Array) -> usize {
        if source.is_empty() {
            return 0;
        }
        if source.is_struct() {
            source.len()
        } else if source.is_numeric() || source.is_logical() {
            source.rows()
        } else {
            0
        }
    }

    /// A new message populated from element/row `index` of `source`
    pub fn from_matlab(&self, source: &Array, index: usize) -> BridgeResult<Message> {
        let mut message = self.descriptor.instantiate();
        self.from_matlab_into(&mut message, source, index)?;
        Ok(message)
    }

    /// Update `target` in place from element/row `index` of `source`
    ///
    /// Fields absent from `source` keep their current values.
    pub fn from_matlab_into(&self, target: &mut Message, source: &Array, index: usize) -> BridgeResult<()> {
        let from_struct_source = source.is_struct();
        if !from_struct_source && !source.is_numeric() && !source.is_logical() {
            return Err(BridgeError::InvalidArgument(format!(
                "cannot read a {} message from a {} array",
                self.descriptor.name(),
                source.class_name()
            )));
        }

        let count = self.number_of_instances(source);
        if index >= count {
            return Err(BridgeError::InvalidArgument(format!(
                "index {} out of range: source holds {} {} instance(s)",
                index,
                count,
                self.descriptor.name()
            )));
        }

        if from_struct_source {
            from_struct(target, source, index)
        } else {
            from_double_matrix(target, source, index)
        }
    }

    /// Field value read from a host array
    pub fn convert_from_matlab(&self, field: &FieldDescriptor, source: &Array) -> BridgeResult<FieldValue> {
        let mut value = field.default_value();
        update_field(&mut value, field, source)?;
        Ok(value)
    }

    /// Consume the values of `field` from the front of `values`, writing
    /// them into `target`; returns the rest
    pub fn convert_from_double<'a>(
        &self,
        target: &mut FieldValue,
        field: &FieldDescriptor,
        values: &'a [f64],
    ) -> &'a [f64] {
        read_double_field(target, field, values)
    }
}

// ============================================================================
// Message to host
// ============================================================================

fn write_struct(message: &Message, target: &mut Array, index: usize, size: usize) -> BridgeResult<()> {
    if target.is_empty() && !target.is_struct() {
        *target = Array::struct_array(&message.descriptor().field_names(), size.max(index + 1));
    }
    if !target.is_struct() {
        return Err(BridgeError::InvalidArgument(format!(
            "cannot write a {} message into a {} array",
            message.type_name(),
            target.class_name()
        )));
    }

    for (field, value) in message.fields() {
        target.set_field(index, field.name(), field_to_host(field, value)?)?;
    }
    Ok(())
}

fn write_row(message: &Message, target: &mut Array, index: usize, size: usize) -> BridgeResult<()> {
    let width = message.descriptor().numeric_width();
    if target.is_empty() {
        *target = Array::zeros(size.max(index + 1), width);
    }
    if !target.is_double() {
        return Err(BridgeError::InvalidArgument(format!(
            "cannot write a {} message into a {} array",
            message.type_name(),
            target.class_name()
        )));
    }

    let mut row = Vec::with_capacity(width);
    flatten(message, &mut row);
    target.set_row(index, &row)
}

/// Host value of one field
fn field_to_host(field: &FieldDescriptor, value: &FieldValue) -> BridgeResult<Array> {
    let field_type = field.field_type();
    let array = match value {
        FieldValue::Leaf(leaf) => leaf_to_host(field_type, leaf),
        FieldValue::Leaves(leaves) => leaves_to_host(field_type, leaves),
        FieldValue::Message(nested) => {
            let mut target = Array::empty();
            write_struct(nested, &mut target, 0, 1)?;
            target
        }
        FieldValue::Messages(nested) => match field.nested() {
            Some(descriptor) if nested.is_empty() => Array::struct_array(&descriptor.field_names(), 0),
            _ => {
                let mut target = Array::empty();
                for (index, message) in nested.iter().enumerate() {
                    write_struct(message, &mut target, index, nested.len())?;
                }
                target
            }
        },
    };
    Ok(array)
}

fn leaf_to_host(field_type: &FieldType, leaf: &Leaf) -> Array {
    match leaf {
        Leaf::String(s) => Array::string(s.as_str()),
        Leaf::Bool(b) => Array::logical_scalar(*b),
        // unset stamps
        Leaf::Time(t) if t.is_sentinel() => Array::empty(),
        _ => {
            let value = leaf.to_f64().unwrap_or(0.0);
            Array::scalar(host_class(field_type), value)
        }
    }
}

fn leaves_to_host(field_type: &FieldType, leaves: &[Leaf]) -> Array {
    match field_type {
        FieldType::String => Array::cell(
            leaves
                .iter()
                .map(|leaf| Array::string(leaf.as_str().unwrap_or_default()))
                .collect(),
        ),
        FieldType::Numeric(t) if t.host_class().is_none() => {
            Array::logical_row(leaves.iter().map(|leaf| matches!(leaf, Leaf::Bool(true))).collect())
        }
        _ => Array::numeric_row(host_class(field_type), leaves.iter().map(leaf_to_f64).collect()),
    }
}

fn host_class(field_type: &FieldType) -> NumericClass {
    match field_type {
        FieldType::Numeric(t) => t.host_class().unwrap_or(NumericClass::Double),
        _ => NumericClass::Double,
    }
}

/// Matrix cell value of a leaf; unset stamps become NaN
fn leaf_to_f64(leaf: &Leaf) -> f64 {
    match leaf {
        Leaf::Time(t) if t.is_sentinel() => f64::NAN,
        _ => leaf.to_f64().unwrap_or(f64::NAN),
    }
}

/// Append the double-matrix columns of `message` to `row`
fn flatten(message: &Message, row: &mut Vec<f64>) {
    for (field, value) in message.fields() {
        let count = match field.arity() {
            Arity::Single => 1,
            Arity::Fixed(n) => n,
            Arity::Repeated => continue,
        };

        match (field.field_type(), value) {
            (FieldType::String, _) => {}
            (FieldType::Message(_), FieldValue::Message(nested)) => flatten(nested, row),
            (FieldType::Message(d), FieldValue::Messages(nested)) => {
                for i in 0..count {
                    match nested.get(i) {
                        Some(m) => flatten(m, row),
                        None => row.extend(std::iter::repeat(0.0).take(d.numeric_width())),
                    }
                }
            }
            (_, FieldValue::Leaf(leaf)) => row.push(leaf_to_f64(leaf)),
            (_, FieldValue::Leaves(leaves)) => {
                for i in 0..count {
                    row.push(leaves.get(i).map_or(0.0, leaf_to_f64));
                }
            }
            // value does not fit its field; keep the columns aligned
            _ => row.extend(std::iter::repeat(0.0).take(field.numeric_width())),
        }
    }
}

fn expand(message: &Message) -> Vec<Message> {
    let mut results = vec![message.clone()];

    for (index, (field, value)) in message.fields().enumerate() {
        let choices: Vec<FieldValue> = match value {
            FieldValue::Message(nested) => expand(nested).into_iter().map(FieldValue::Message).collect(),
            FieldValue::Messages(nested) if field.arity() == Arity::Repeated && !nested.is_empty() => nested
                .iter()
                .flat_map(expand)
                .map(|m| FieldValue::Messages(vec![m]))
                .collect(),
            _ => continue,
        };
        if choices.len() <= 1 && field.arity() != Arity::Repeated {
            continue;
        }

        results = results
            .into_iter()
            .flat_map(|partial| {
                choices.iter().map(move |choice| {
                    let mut combined = partial.clone();
                    if let Some(slot) = combined.value_at_mut(index) {
                        *slot = choice.clone();
                    }
                    combined
                })
            })
            .collect();
    }

    results
}

// ============================================================================
// Host to message
// ============================================================================

fn from_struct(target: &mut Message, source: &Array, index: usize) -> BridgeResult<()> {
    let descriptor = Arc::clone(target.descriptor());
    for (slot, field) in descriptor.fields().iter().enumerate() {
        let Some(value) = source.field(index, field.name()) else {
            continue;
        };
        if let Some(current) = target.value_at_mut(slot) {
            update_field(current, field, value)?;
        }
    }
    Ok(())
}

fn from_double_matrix(target: &mut Message, source: &Array, row: usize) -> BridgeResult<()> {
    let values = row_values(source, row).ok_or_else(|| {
        BridgeError::InvalidArgument(format!("row {} is outside a {} array", row, source))
    })?;
    read_double_message(target, &values);
    Ok(())
}

/// Row of a numeric or logical matrix as doubles
fn row_values(source: &Array, row: usize) -> Option<Vec<f64>> {
    let values = source.to_f64_vec()?;
    let (rows, cols) = source.dims();
    if row >= rows {
        return None;
    }
    Some((0..cols).map(|c| values[c * rows + row]).collect())
}

/// Update `current` from a host value; nested single messages are
/// updated in place so their absent fields survive
fn update_field(current: &mut FieldValue, field: &FieldDescriptor, source: &Array) -> BridgeResult<()> {
    match field.field_type() {
        FieldType::Message(descriptor) => update_message_field(current, field, descriptor, source),
        field_type => {
            *current = leaves_from_host(field, field_type, source);
            Ok(())
        }
    }
}

fn update_message_field(
    current: &mut FieldValue,
    field: &FieldDescriptor,
    descriptor: &Arc<MessageDescriptor>,
    source: &Array,
) -> BridgeResult<()> {
    if field.arity() == Arity::Single {
        if source.is_empty() && !source.is_struct() {
            return Ok(());
        }
        if !source.is_struct() {
            return Err(structure_mismatch(field, source));
        }
        if !matches!(current, FieldValue::Message(_)) {
            *current = FieldValue::Message(descriptor.instantiate());
        }
        if let FieldValue::Message(nested) = current {
            if !source.is_empty() {
                from_struct(nested, source, 0)?;
            }
        }
        return Ok(());
    }

    let elements: Vec<Message> = if source.is_empty() {
        Vec::new()
    } else if source.is_struct() {
        (0..source.len())
            .map(|i| {
                let mut nested = descriptor.instantiate();
                from_struct(&mut nested, source, i).map(|_| nested)
            })
            .collect::<BridgeResult<_>>()?
    } else if let Some(cells) = source.cell_elements() {
        cells
            .iter()
            .map(|cell| {
                if !cell.is_struct() {
                    return Err(structure_mismatch(field, cell));
                }
                let mut nested = descriptor.instantiate();
                if !cell.is_empty() {
                    from_struct(&mut nested, cell, 0)?;
                }
                Ok(nested)
            })
            .collect::<BridgeResult<_>>()?
    } else {
        return Err(structure_mismatch(field, source));
    };

    *current = FieldValue::Messages(match field.arity() {
        Arity::Fixed(n) => resize_with(elements, n, || descriptor.instantiate()),
        _ => elements,
    });
    Ok(())
}

fn structure_mismatch(field: &FieldDescriptor, source: &Array) -> BridgeError {
    BridgeError::Conversion(format!(
        "field '{}' of type {} needs a struct, got {}",
        field.name(),
        field.field_type(),
        source
    ))
}

/// Leaf field value from a host array; unreadable input gives defaults
fn leaves_from_host(field: &FieldDescriptor, field_type: &FieldType, source: &Array) -> FieldValue {
    let default = || Leaf::default_for(field_type).unwrap_or(Leaf::Float(0.0));

    let leaves: Vec<Leaf> = match field_type {
        FieldType::String => {
            if let Some(s) = source.as_string() {
                vec![Leaf::String(s.to_string())]
            } else if let Some(cells) = source.cell_elements() {
                cells
                    .iter()
                    .map(|c| Leaf::String(c.as_string().unwrap_or_default().to_string()))
                    .collect()
            } else {
                lenient_leaf(field, source);
                Vec::new()
            }
        }
        _ => match source.to_f64_vec() {
            Some(values) => values
                .into_iter()
                .filter_map(|v| Leaf::from_host_number(field_type, v))
                .collect(),
            None => {
                lenient_leaf(field, source);
                Vec::new()
            }
        },
    };

    match field.arity() {
        Arity::Single => FieldValue::Leaf(leaves.into_iter().next().unwrap_or_else(default)),
        Arity::Fixed(n) => FieldValue::Leaves(resize_with(leaves, n, default)),
        Arity::Repeated => FieldValue::Leaves(leaves),
    }
}

fn lenient_leaf(field: &FieldDescriptor, source: &Array) {
    tracing::debug!(
        event = "leaf_default",
        field = field.name(),
        source = %source,
        "Unreadable leaf value replaced by its default"
    );
}

fn resize_with<T>(mut values: Vec<T>, len: usize, fill: impl FnMut() -> T) -> Vec<T> {
    values.resize_with(len, fill);
    values
}

fn read_double_message<'a>(target: &mut Message, mut values: &'a [f64]) -> &'a [f64] {
    let descriptor = Arc::clone(target.descriptor());
    for (slot, field) in descriptor.fields().iter().enumerate() {
        if let Some(current) = target.value_at_mut(slot) {
            values = read_double_field(current, field, values);
        }
    }
    values
}

/// Consume `field`'s columns from the front of `values`
///
/// Fields whose columns run past the end of `values` keep what they had.
fn read_double_field<'a>(current: &mut FieldValue, field: &FieldDescriptor, values: &'a [f64]) -> &'a [f64] {
    let count = match field.arity() {
        Arity::Single => 1,
        Arity::Fixed(n) => n,
        Arity::Repeated => return values,
    };

    match (field.field_type(), current) {
        (FieldType::String, _) => values,
        (FieldType::Message(_), FieldValue::Message(nested)) => read_double_message(nested, values),
        (FieldType::Message(descriptor), FieldValue::Messages(nested)) => {
            if nested.len() < count {
                nested.resize_with(count, || descriptor.instantiate());
            }
            let mut rest = values;
            for message in nested.iter_mut().take(count) {
                rest = read_double_message(message, rest);
            }
            rest
        }
        (field_type, FieldValue::Leaf(leaf)) => match values.split_first() {
            Some((&v, rest)) => {
                if let Some(new) = Leaf::from_host_number(field_type, v) {
                    *leaf = new;
                }
                rest
            }
            None => values,
        },
        (field_type, FieldValue::Leaves(leaves)) => {
            let take = count.min(values.len());
            for (i, &v) in values[..take].iter().enumerate() {
                let Some(new) = Leaf::from_host_number(field_type, v) else {
                    continue;
                };
                match leaves.get_mut(i) {
                    Some(leaf) => *leaf = new,
                    None => leaves.push(new),
                }
            }
            &values[take..]
        }
        _ => &values[field.numeric_width().min(values.len())..],
    }
}
