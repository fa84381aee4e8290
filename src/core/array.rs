//! Host array model
//!
//! In-process model of the host environment's untyped arrays. Everything the
//! bridge exchanges with the host travels as an [`Array`]: numeric matrices,
//! logical and char arrays, cell arrays, struct arrays and instances of host
//! wrapper classes. Matrices are two-dimensional and column-major, as on the
//! host side.

use crate::errors::{BridgeError, BridgeResult};
use std::fmt;

/// Numeric storage class of a host array
///
/// Values of every class are held as `f64`; integer classes are exact up to 2^53.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericClass {
    Double,
    Single,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
}

impl NumericClass {
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Double | Self::Single)
    }

    #[inline]
    pub const fn is_integer(self) -> bool {
        !self.is_float()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Single => "single",
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
        }
    }
}

/// Payload of a host array
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Numeric { class: NumericClass, values: Vec<f64> },
    Logical(Vec<bool>),
    Char(String),
    Cell(Vec<Array>),
    /// Struct array: one value per field name in every element
    Struct { fields: Vec<String>, elements: Vec<Vec<Array>> },
    /// Instance of a host-side wrapper class
    Object { class_name: String, properties: Vec<(String, Array)> },
}

/// A host array value
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    dims: (usize, usize),
    data: ArrayData,
    persistent: bool,
}

impl Array {
    fn with_data(dims: (usize, usize), data: ArrayData) -> Self {
        Self { dims, data, persistent: false }
    }

    /// The 0x0 double array the host uses for "no value"
    pub fn empty() -> Self {
        Self::with_data(
            (0, 0),
            ArrayData::Numeric { class: NumericClass::Double, values: Vec::new() },
        )
    }

    pub fn double_scalar(value: f64) -> Self {
        Self::scalar(NumericClass::Double, value)
    }

    pub fn scalar(class: NumericClass, value: f64) -> Self {
        Self::with_data((1, 1), ArrayData::Numeric { class, values: vec![value] })
    }

    /// Row vector of the given class; an empty input yields a 0x0 array
    pub fn numeric_row(class: NumericClass, values: Vec<f64>) -> Self {
        let dims = if values.is_empty() { (0, 0) } else { (1, values.len()) };
        Self::with_data(dims, ArrayData::Numeric { class, values })
    }

    /// Column-major `rows` x `cols` double matrix
    pub fn double_matrix(rows: usize, cols: usize, values: Vec<f64>) -> Self {
        debug_assert_eq!(rows * cols, values.len());
        Self::with_data(
            (rows, cols),
            ArrayData::Numeric { class: NumericClass::Double, values },
        )
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::double_matrix(rows, cols, vec![0.0; rows * cols])
    }

    pub fn logical_scalar(value: bool) -> Self {
        Self::with_data((1, 1), ArrayData::Logical(vec![value]))
    }

    pub fn logical_row(values: Vec<bool>) -> Self {
        let dims = if values.is_empty() { (0, 0) } else { (1, values.len()) };
        Self::with_data(dims, ArrayData::Logical(values))
    }

    pub fn string(value: impl Into<String>) -> Self {
        let value = value.into();
        let len = value.chars().count();
        let dims = if len == 0 { (0, 0) } else { (1, len) };
        Self::with_data(dims, ArrayData::Char(value))
    }

    pub fn cell(elements: Vec<Array>) -> Self {
        Self::with_data((1, elements.len()), ArrayData::Cell(elements))
    }

    /// 1 x `len` struct array with every field set to the empty array
    pub fn struct_array<S: AsRef<str>>(fields: &[S], len: usize) -> Self {
        let fields: Vec<String> = fields.iter().map(|f| f.as_ref().to_string()).collect();
        let elements = (0..len).map(|_| vec![Array::empty(); fields.len()]).collect();
        Self::with_data((1, len), ArrayData::Struct { fields, elements })
    }

    pub fn object(class_name: impl Into<String>, properties: Vec<(String, Array)>) -> Self {
        Self::with_data(
            (1, 1),
            ArrayData::Object { class_name: class_name.into(), properties },
        )
    }

    #[inline]
    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    #[inline]
    pub fn dims(&self) -> (usize, usize) {
        self.dims
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.dims.0
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.dims.1
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.dims.0 * self.dims.1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Class name as the host reports it
    pub fn class_name(&self) -> &str {
        match &self.data {
            ArrayData::Numeric { class, .. } => class.name(),
            ArrayData::Logical(_) => "logical",
            ArrayData::Char(_) => "char",
            ArrayData::Cell(_) => "cell",
            ArrayData::Struct { .. } => "struct",
            ArrayData::Object { class_name, .. } => class_name,
        }
    }

    /// Whether this is an instance of the host wrapper class `name`
    pub fn is_class(&self, name: &str) -> bool {
        matches!(&self.data, ArrayData::Object { class_name, .. } if class_name == name)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ArrayData::Numeric { .. })
    }

    pub fn is_double(&self) -> bool {
        matches!(self.data, ArrayData::Numeric { class: NumericClass::Double, .. })
    }

    pub fn is_logical(&self) -> bool {
        matches!(self.data, ArrayData::Logical(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self.data, ArrayData::Char(_))
    }

    pub fn is_cell(&self) -> bool {
        matches!(self.data, ArrayData::Cell(_))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.data, ArrayData::Struct { .. })
    }

    pub fn is_object(&self) -> bool {
        matches!(self.data, ArrayData::Object { .. })
    }

    pub fn is_scalar(&self) -> bool {
        self.len() == 1
    }

    /// Floating-point (double or single) scalar
    pub fn is_double_scalar(&self) -> bool {
        self.is_scalar()
            && matches!(&self.data, ArrayData::Numeric { class, .. } if class.is_float())
    }

    pub fn is_integer_scalar(&self) -> bool {
        self.is_scalar()
            && matches!(&self.data, ArrayData::Numeric { class, .. } if class.is_integer())
    }

    pub fn is_logical_scalar(&self) -> bool {
        self.is_scalar() && self.is_logical()
    }

    pub fn as_string(&self) -> Option<&str> {
        match &self.data {
            ArrayData::Char(s) => Some(s),
            _ => None,
        }
    }

    /// String contents, or an empty string for non-char arrays
    pub fn string_value(&self) -> String {
        self.as_string().map(str::to_string).unwrap_or_default()
    }

    /// Numeric scalar widened to `f64`; NaN for anything else
    pub fn double_scalar_value(&self) -> f64 {
        match &self.data {
            ArrayData::Numeric { values, .. } if values.len() == 1 => values[0],
            _ => f64::NAN,
        }
    }

    /// Numeric scalar truncated to an integer; 0 for anything else
    pub fn integer_scalar_value(&self) -> i64 {
        let value = self.double_scalar_value();
        if value.is_nan() {
            0
        } else {
            value as i64
        }
    }

    /// Logical scalar, else non-zero numeric scalar, else false
    pub fn logical_scalar_value(&self) -> bool {
        if self.is_logical_scalar() {
            if let ArrayData::Logical(values) = &self.data {
                return values[0];
            }
        }
        if self.is_integer_scalar() || self.is_double_scalar() {
            return self.double_scalar_value() != 0.0;
        }
        false
    }

    pub fn numeric_values(&self) -> Option<&[f64]> {
        match &self.data {
            ArrayData::Numeric { values, .. } => Some(values),
            _ => None,
        }
    }

    /// Numeric or logical contents as doubles
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match &self.data {
            ArrayData::Numeric { values, .. } => Some(values.clone()),
            ArrayData::Logical(values) => {
                Some(values.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect())
            }
            _ => None,
        }
    }

    /// Row `row` of a numeric matrix
    pub fn row(&self, row: usize) -> Option<Vec<f64>> {
        let values = self.numeric_values()?;
        let (rows, cols) = self.dims;
        if row >= rows {
            return None;
        }
        Some((0..cols).map(|c| values[c * rows + row]).collect())
    }

    /// Overwrite row `row` of a double matrix
    pub fn set_row(&mut self, row: usize, data: &[f64]) -> BridgeResult<()> {
        let (rows, cols) = self.dims;
        let class = self.class_name().to_string();
        let ArrayData::Numeric { values, .. } = &mut self.data else {
            return Err(BridgeError::InvalidArgument(format!(
                "cannot write a numeric row into a {} array",
                class
            )));
        };
        if row >= rows || data.len() != cols {
            return Err(BridgeError::Conversion(format!(
                "row {} of width {} does not fit a {}x{} matrix",
                row,
                data.len(),
                rows,
                cols
            )));
        }
        for (c, value) in data.iter().enumerate() {
            values[c * rows + row] = *value;
        }
        Ok(())
    }

    pub fn cell_elements(&self) -> Option<&[Array]> {
        match &self.data {
            ArrayData::Cell(elements) => Some(elements),
            _ => None,
        }
    }

    pub fn field_names(&self) -> Option<&[String]> {
        match &self.data {
            ArrayData::Struct { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Field `name` of struct element `index`
    pub fn field(&self, index: usize, name: &str) -> Option<&Array> {
        let ArrayData::Struct { fields, elements } = &self.data else {
            return None;
        };
        let slot = fields.iter().position(|f| f == name)?;
        elements.get(index).map(|element| &element[slot])
    }

    /// Set field `name` of struct element `index`, adding the field and
    /// growing the struct array as needed. Other elements are untouched.
    pub fn set_field(&mut self, index: usize, name: &str, value: Array) -> BridgeResult<()> {
        let class = self.class_name().to_string();
        let ArrayData::Struct { fields, elements } = &mut self.data else {
            return Err(BridgeError::InvalidArgument(format!(
                "cannot set field '{}' on a {} array",
                name, class
            )));
        };

        let slot = match fields.iter().position(|f| f == name) {
            Some(slot) => slot,
            None => {
                fields.push(name.to_string());
                for element in elements.iter_mut() {
                    element.push(Array::empty());
                }
                fields.len() - 1
            }
        };

        if index >= elements.len() {
            let width = fields.len();
            elements.resize_with(index + 1, || vec![Array::empty(); width]);
            self.dims = (1, elements.len());
        }

        elements[index][slot] = value;
        Ok(())
    }

    /// Property `name` of a wrapper-class instance
    pub fn property(&self, name: &str) -> Option<&Array> {
        match &self.data {
            ArrayData::Object { properties, .. } => {
                properties.iter().find(|(key, _)| key == name).map(|(_, value)| value)
            }
            _ => None,
        }
    }

    /// Exempt this array from the host's call-scope deallocation
    pub fn make_persistent(&mut self) {
        self.persistent = true;
    }

    #[inline]
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }
}

impl Default for Array {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} {}", self.dims.0, self.dims.1, self.class_name())
    }
}
