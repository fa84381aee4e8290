//! Python host embedding
//!
//! Python plays the host environment: call arguments are converted to host
//! arrays, routed through the dispatch entry point, and the outputs are
//! converted back.
//!
//! ```python
//! import mexbridge
//! mexbridge.define_message("geometry/Point", [("x", "float64"), ("y", "float64")])
//! h = mexbridge.message(0, "create", "geometry/Point")
//! mexbridge.message(h, "set", "x", 2.0)
//! mexbridge.message(h, "toStruct")   # {'x': 2.0, 'y': 0.0}
//! mexbridge.message(h, "delete")
//! ```

use crate::classes::MessageObject;
use crate::conversion::{FieldDescriptor, MessageDescriptor, OutputShape, TypeRegistry};
use crate::core::{Array, ArrayData, NumericClass};
use crate::errors::BridgeError;
use crate::object::{call, NativeClass, HANDLE_FIELD};
use pyo3::exceptions::{PyAttributeError, PyLookupError, PyRuntimeError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyFloat, PyList, PyLong, PyString, PyTuple};

impl From<BridgeError> for PyErr {
    fn from(error: BridgeError) -> Self {
        let message = format!("{}: {}", error.identifier(), error);
        match error {
            BridgeError::ArgumentCount { .. }
            | BridgeError::InvalidArgument(_)
            | BridgeError::UnknownArgument { .. } => PyValueError::new_err(message),
            BridgeError::InvalidHandle(_) | BridgeError::InstanceNotFound { .. } => {
                PyLookupError::new_err(message)
            }
            BridgeError::UnknownMethod { .. } => PyAttributeError::new_err(message),
            BridgeError::Conversion(_) => PyTypeError::new_err(message),
            BridgeError::Config(_) => PyRuntimeError::new_err(message),
        }
    }
}

/// Python value to host array
///
/// Objects with a `handle` attribute become wrapper-class instances; their
/// `class_name` attribute names the class (the message class by default).
pub fn to_host(value: &PyAny) -> PyResult<Array> {
    if value.is_none() {
        return Ok(Array::empty());
    }
    // bool before int: Python bools are ints
    if value.is_instance_of::<PyBool>() {
        return Ok(Array::logical_scalar(value.extract::<bool>()?));
    }
    if value.is_instance_of::<PyLong>() {
        return Ok(Array::scalar(NumericClass::Int64, value.extract::<i64>()? as f64));
    }
    if value.is_instance_of::<PyFloat>() {
        return Ok(Array::double_scalar(value.extract::<f64>()?));
    }
    if let Ok(s) = value.downcast::<PyString>() {
        return Ok(Array::string(s.to_str()?));
    }
    if let Ok(list) = value.downcast::<PyList>() {
        return Ok(Array::cell(list.iter().map(to_host).collect::<PyResult<_>>()?));
    }
    if let Ok(tuple) = value.downcast::<PyTuple>() {
        return Ok(Array::cell(tuple.iter().map(to_host).collect::<PyResult<_>>()?));
    }
    if let Ok(dict) = value.downcast::<PyDict>() {
        let mut record = Array::struct_array::<&str>(&[], 1);
        for (key, item) in dict.iter() {
            let key: &str = key.extract()?;
            record.set_field(0, key, to_host(item)?)?;
        }
        return Ok(record);
    }
    if value.hasattr(HANDLE_FIELD)? {
        let handle = to_host(value.getattr(HANDLE_FIELD)?)?;
        let class_name = match value.getattr("class_name") {
            Ok(name) => name.extract::<String>()?,
            Err(_) => MessageObject::CLASS_NAME.to_string(),
        };
        return Ok(Array::object(class_name, vec![(HANDLE_FIELD.to_string(), handle)]));
    }

    Err(PyTypeError::new_err(format!(
        "cannot pass a {} to the bridge",
        value.get_type().name()?
    )))
}

/// Host array to Python value
pub fn to_python(py: Python<'_>, array: &Array) -> PyResult<PyObject> {
    let object = match array.data() {
        ArrayData::Numeric { class, values } => {
            let convert = |v: f64| -> PyObject {
                if class.is_integer() {
                    (v as i64).into_py(py)
                } else {
                    v.into_py(py)
                }
            };
            let (rows, cols) = array.dims();
            if array.is_scalar() {
                convert(values[0])
            } else if rows <= 1 {
                PyList::new(py, values.iter().map(|&v| convert(v))).into_py(py)
            } else {
                let matrix: Vec<PyObject> = (0..rows)
                    .map(|r| PyList::new(py, (0..cols).map(|c| convert(values[c * rows + r]))).into_py(py))
                    .collect();
                PyList::new(py, matrix).into_py(py)
            }
        }
        ArrayData::Logical(values) => {
            if array.is_scalar() {
                values[0].into_py(py)
            } else {
                PyList::new(py, values.iter().copied()).into_py(py)
            }
        }
        ArrayData::Char(s) => s.as_str().into_py(py),
        ArrayData::Cell(elements) => {
            let items = elements
                .iter()
                .map(|e| to_python(py, e))
                .collect::<PyResult<Vec<_>>>()?;
            PyList::new(py, items).into_py(py)
        }
        ArrayData::Struct { fields, elements } => {
            let mut records = Vec::with_capacity(elements.len());
            for element in elements {
                let record = PyDict::new(py);
                for (name, value) in fields.iter().zip(element) {
                    record.set_item(name, to_python(py, value)?)?;
                }
                records.push(record.into_py(py));
            }
            if array.is_scalar() {
                records.swap_remove(0)
            } else {
                PyList::new(py, records).into_py(py)
            }
        }
        ArrayData::Object { properties, .. } => {
            let record = PyDict::new(py);
            for (name, value) in properties {
                record.set_item(name, to_python(py, value)?)?;
            }
            record.into_py(py)
        }
    };
    Ok(object)
}

/// `message(handle, method, *args, nargout=1)`
///
/// Returns None, the single output, or a tuple of outputs.
#[pyfunction]
#[pyo3(signature = (*args, nargout = 1))]
fn message(py: Python<'_>, args: &PyTuple, nargout: usize) -> PyResult<PyObject> {
    let inputs = args.iter().map(to_host).collect::<PyResult<Vec<_>>>()?;
    let outputs = call::<MessageObject>(nargout, &inputs)?;

    Ok(match outputs.len() {
        0 => py.None(),
        1 => to_python(py, &outputs[0])?,
        _ => {
            let values = outputs
                .iter()
                .map(|o| to_python(py, o))
                .collect::<PyResult<Vec<_>>>()?;
            PyTuple::new(py, values).into_py(py)
        }
    })
}

/// Register a message type from `(name, type spec)` pairs
#[pyfunction]
#[pyo3(signature = (name, fields, shape = None))]
fn define_message(name: &str, fields: Vec<(String, String)>, shape: Option<&str>) -> PyResult<()> {
    let registry = TypeRegistry::global();
    let fields = fields
        .iter()
        .map(|(field, spec)| FieldDescriptor::parse(field.as_str(), spec, registry))
        .collect::<Result<Vec<_>, _>>()?;

    let mut descriptor = MessageDescriptor::new(name, fields);
    if let Some(shape) = shape {
        let shape = OutputShape::parse(shape)
            .ok_or_else(|| PyValueError::new_err(format!("unknown shape '{}'", shape)))?;
        descriptor = descriptor.with_preferred_shape(shape);
    }
    registry.register(descriptor);
    Ok(())
}

/// Names of the registered message types
#[pyfunction]
fn message_types() -> Vec<String> {
    TypeRegistry::global().names()
}

#[pymodule]
fn mexbridge(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    crate::init();
    m.add_function(wrap_pyfunction!(message, m)?)?;
    m.add_function(wrap_pyfunction!(define_message, m)?)?;
    m.add_function(wrap_pyfunction!(message_types, m)?)?;
    m.add("MESSAGE_CLASS", MessageObject::CLASS_NAME)?;
    Ok(())
}
