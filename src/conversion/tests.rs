//! Tests for schemas, messages and the conversion engine

use super::*;
use crate::core::{Array, NumericClass};
use crate::errors::BridgeError;
use crate::options::Options;
use proptest::prelude::*;
use std::sync::Arc;

// Test schemas
fn point_type() -> Arc<MessageDescriptor> {
    MessageDescriptor::new(
        "test/Point",
        vec![
            FieldDescriptor::numeric("x", NumericType::Float64),
            FieldDescriptor::numeric("y", NumericType::Float64),
            FieldDescriptor::numeric("z", NumericType::Float64),
        ],
    )
    .into_arc()
}

fn sample_type() -> Arc<MessageDescriptor> {
    MessageDescriptor::new(
        "test/Sample",
        vec![
            FieldDescriptor::numeric("x", NumericType::Float64),
            FieldDescriptor::new("names", FieldType::String).repeated(),
        ],
    )
    .into_arc()
}

fn stamped_type() -> Arc<MessageDescriptor> {
    let point = point_type();
    MessageDescriptor::new(
        "test/Stamped",
        vec![
            FieldDescriptor::new("stamp", FieldType::Time),
            FieldDescriptor::numeric("count", NumericType::Int32),
            FieldDescriptor::numeric("flag", NumericType::Bool),
            FieldDescriptor::new("label", FieldType::String),
            FieldDescriptor::message("position", Arc::clone(&point)),
            FieldDescriptor::message("corners", Arc::clone(&point)).fixed(2),
            FieldDescriptor::message("points", point).repeated(),
            FieldDescriptor::numeric("covariance", NumericType::Float64).fixed(3),
            FieldDescriptor::new("tags", FieldType::String).repeated(),
        ],
    )
    .into_arc()
}

fn path_type() -> Arc<MessageDescriptor> {
    MessageDescriptor::new(
        "test/Path",
        vec![
            FieldDescriptor::numeric("id", NumericType::UInt32),
            FieldDescriptor::message("poses", point_type()).repeated(),
        ],
    )
    .into_arc()
}

fn point(x: f64, y: f64, z: f64) -> Message {
    let mut message = point_type().instantiate();
    message
        .set("x", Leaf::Float(x))
        .unwrap()
        .set("y", Leaf::Float(y))
        .unwrap()
        .set("z", Leaf::Float(z))
        .unwrap();
    message
}

fn sample(x: f64, names: &[&str]) -> Message {
    let mut message = sample_type().instantiate();
    message.set("x", Leaf::Float(x)).unwrap();
    message
        .set("names", FieldValue::Leaves(names.iter().map(|&n| Leaf::from(n)).collect()))
        .unwrap();
    message
}

fn stamped() -> Message {
    let mut message = stamped_type().instantiate();
    message
        .set("stamp", Leaf::Time(Time::new(10, 0)))
        .unwrap()
        .set("count", Leaf::Int(-3))
        .unwrap()
        .set("flag", Leaf::Bool(true))
        .unwrap()
        .set("label", Leaf::from("base"))
        .unwrap()
        .set("position", point(1.0, 2.0, 3.0))
        .unwrap()
        .set("corners", FieldValue::Messages(vec![point(4.0, 5.0, 6.0), point(7.0, 8.0, 9.0)]))
        .unwrap()
        .set("covariance", FieldValue::Leaves(vec![0.5.into(), 0.25.into(), 0.125.into()]))
        .unwrap();
    message
}

fn struct_of(fields: Vec<(&str, Array)>) -> Array {
    let mut array = Array::struct_array::<&str>(&[], 1);
    for (name, value) in fields {
        array.set_field(0, name, value).unwrap();
    }
    array
}

// ============================================================================
// Schema and messages
// ============================================================================

#[test]
fn test_instantiate_defaults() {
    let message = stamped_type().instantiate();

    assert_eq!(message.leaf("stamp"), Some(&Leaf::Time(Time::ZERO)));
    assert_eq!(message.leaf("count"), Some(&Leaf::Int(0)));
    assert_eq!(message.leaf("flag"), Some(&Leaf::Bool(false)));
    assert_eq!(message.leaf("label"), Some(&Leaf::String(String::new())));
    assert_eq!(message.get("corners").and_then(FieldValue::as_messages).map(<[_]>::len), Some(2));
    assert_eq!(message.get("points").and_then(FieldValue::as_messages).map(<[_]>::len), Some(0));
    assert_eq!(message.get("covariance").and_then(FieldValue::as_leaves).map(<[_]>::len), Some(3));
}

#[test]
fn test_numeric_width() {
    // stamp, count, flag, position(3), corners(2x3), covariance(3)
    assert_eq!(stamped_type().numeric_width(), 15);
    assert_eq!(sample_type().numeric_width(), 1);
}

#[test]
fn test_set_rejects_mismatched_values() {
    let mut message = stamped_type().instantiate();

    assert!(message.set("count", Leaf::Float(1.0)).is_err());
    assert!(message.set("corners", FieldValue::Messages(vec![point(0.0, 0.0, 0.0)])).is_err());
    assert!(message.set("position", sample(1.0, &[])).is_err());
    assert!(matches!(
        message.set("missing", Leaf::Int(1)),
        Err(BridgeError::InvalidArgument(_))
    ));
}

#[test]
fn test_leaf_saturation() {
    assert_eq!(Leaf::from_f64(NumericType::Int8, 300.0), Leaf::Int(127));
    assert_eq!(Leaf::from_f64(NumericType::UInt8, -5.0), Leaf::UInt(0));
    assert_eq!(Leaf::from_f64(NumericType::Int32, f64::NAN), Leaf::Int(0));
    assert_eq!(Leaf::from_f64(NumericType::Bool, 2.0), Leaf::Bool(true));
}

#[test]
fn test_type_registry() {
    let registry = TypeRegistry::new();
    registry.register(MessageDescriptor::new("test/Empty", vec![]));
    registry.insert(point_type());

    assert!(registry.contains("test/Point"));
    assert_eq!(registry.names(), vec!["test/Empty", "test/Point"]);
    assert_eq!(registry.get("test/Point").map(|d| d.fields().len()), Some(3));
    assert!(registry.get("test/Missing").is_none());
}

#[test]
fn test_field_spec_parse() {
    let registry = TypeRegistry::new();
    registry.insert(point_type());

    let field = FieldDescriptor::parse("values", "float32[]", &registry).unwrap();
    assert_eq!(field.field_type(), &FieldType::Numeric(NumericType::Float32));
    assert_eq!(field.arity(), Arity::Repeated);

    let field = FieldDescriptor::parse("corners", "test/Point[4]", &registry).unwrap();
    assert_eq!(field.arity(), Arity::Fixed(4));
    assert_eq!(field.numeric_width(), 12);

    let field = FieldDescriptor::parse("stamp", " time ", &registry).unwrap();
    assert_eq!(field.field_type(), &FieldType::Time);
    assert_eq!(field.arity(), Arity::Single);

    assert!(FieldDescriptor::parse("bad", "float64[x]", &registry).is_err());
    assert!(FieldDescriptor::parse("bad", "test/Unknown", &registry).is_err());
}

#[test]
fn test_field_spec_rejects_huge_fixed_length() {
    let registry = TypeRegistry::new();
    registry.insert(point_type());

    assert!(FieldDescriptor::parse("big", "float64[99999999999]", &registry).is_err());
    assert!(FieldDescriptor::parse("big", "test/Point[99999999999999999999]", &registry).is_err());

    let limit = format!("float64[{}]", schema::MAX_FIXED_LEN);
    assert!(FieldDescriptor::parse("limit", &limit, &registry).is_ok());
}

#[test]
fn test_numeric_width_saturates() {
    let wide = FieldDescriptor::message("wide", point_type()).fixed(usize::MAX);
    assert_eq!(wide.numeric_width(), usize::MAX);

    let pair = MessageDescriptor::new("test/Wide", vec![wide.clone(), wide]);
    assert_eq!(pair.numeric_width(), usize::MAX);
}

#[test]
fn test_output_shape_parse() {
    assert_eq!(OutputShape::parse("Struct"), Some(OutputShape::Struct));
    assert_eq!(OutputShape::parse("double"), Some(OutputShape::DoubleMatrix));
    assert_eq!(OutputShape::parse("matrix"), Some(OutputShape::DoubleMatrix));
    assert_eq!(OutputShape::parse("xml"), None);
}

// ============================================================================
// Message to host
// ============================================================================

#[test]
fn test_to_struct_fields() {
    let mut conversion = Conversion::with_options(stamped(), Options::new());
    let result = conversion.to_struct().unwrap();

    assert_eq!(result.dims(), (1, 1));
    assert_eq!(result.field(0, "stamp"), Some(&Array::double_scalar(10.0)));
    assert_eq!(result.field(0, "count"), Some(&Array::scalar(NumericClass::Int32, -3.0)));
    assert_eq!(result.field(0, "flag"), Some(&Array::logical_scalar(true)));
    assert_eq!(result.field(0, "label"), Some(&Array::string("base")));
    assert_eq!(
        result.field(0, "covariance"),
        Some(&Array::numeric_row(NumericClass::Double, vec![0.5, 0.25, 0.125]))
    );

    let position = result.field(0, "position").unwrap();
    assert!(position.is_struct());
    assert_eq!(position.field(0, "y"), Some(&Array::double_scalar(2.0)));

    let corners = result.field(0, "corners").unwrap();
    assert_eq!(corners.len(), 2);
    assert_eq!(corners.field(1, "x"), Some(&Array::double_scalar(7.0)));

    let points = result.field(0, "points").unwrap();
    assert!(points.is_struct());
    assert!(points.is_empty());
    assert_eq!(points.field_names().map(<[_]>::len), Some(3));

    assert_eq!(result.field(0, "tags"), Some(&Array::cell(vec![])));
}

#[test]
fn test_time_sentinels_convert_to_empty() {
    let mut message = stamped();
    message.set("stamp", Leaf::Time(Time::MAX)).unwrap();
    let conversion = Conversion::with_options(message, Options::new());

    let stamp = stamped_type().field("stamp").unwrap().clone();
    assert_eq!(conversion.convert_to_matlab(&stamp).unwrap(), Array::empty());

    let mut message = stamped();
    message.set("stamp", Leaf::Time(Time::MIN)).unwrap();
    let conversion = Conversion::with_options(message, Options::new());
    assert!(conversion.convert_to_matlab(&stamp).unwrap().is_empty());
}

#[test]
fn test_duration_converts_to_seconds() {
    let descriptor = MessageDescriptor::new(
        "test/Timeout",
        vec![FieldDescriptor::new("timeout", FieldType::Duration)],
    )
    .into_arc();
    let mut message = descriptor.instantiate();
    message.set("timeout", Leaf::Duration(Duration::new(-2, 500_000_000))).unwrap();

    let result = Conversion::with_options(message, Options::new()).to_struct().unwrap();
    let seconds = result.field(0, "timeout").unwrap().double_scalar_value();
    assert!((seconds + 1.5).abs() < 1e-9);
}

#[test]
fn test_to_double_matrix_layout() {
    let mut conversion = Conversion::with_options(stamped(), Options::new());
    let matrix = conversion.to_double_matrix().unwrap();

    assert_eq!(matrix.dims(), (1, 15));
    assert_eq!(
        matrix.row(0).unwrap(),
        vec![10.0, -3.0, 1.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 0.5, 0.25, 0.125]
    );
}

#[test]
fn test_to_struct_into_leaves_other_elements() {
    let conversion = Conversion::with_options(sample(1.0, &["a"]), Options::new());
    let mut target = Array::empty();
    conversion.to_struct_into(&mut target, 0, 3).unwrap();
    assert_eq!(target.len(), 3);

    let other = Conversion::with_options(sample(2.0, &["b"]), Options::new());
    other.to_struct_into(&mut target, 2, 3).unwrap();

    assert_eq!(target.field(0, "x"), Some(&Array::double_scalar(1.0)));
    assert_eq!(target.field(1, "x"), Some(&Array::empty()));
    assert_eq!(target.field(2, "x"), Some(&Array::double_scalar(2.0)));
}

#[test]
fn test_to_double_matrix_into_rejects_wrong_target() {
    let conversion = Conversion::with_options(sample(1.0, &[]), Options::new());
    let mut target = Array::string("no");
    assert!(matches!(
        conversion.to_double_matrix_into(&mut target, 0, 1),
        Err(BridgeError::InvalidArgument(_))
    ));
}

#[test]
fn test_format_option_selects_shape() {
    let mut conversion = Conversion::with_options(sample(5.0, &["a"]), Options::new());
    assert!(conversion.to_matlab().unwrap().is_struct());

    conversion.set_options(&[Array::string("format"), Array::string("double")]);
    let matrix = conversion.to_matlab().unwrap();
    assert_eq!(matrix, Array::double_matrix(1, 1, vec![5.0]));
}

#[test]
fn test_preferred_shape_is_default() {
    let descriptor = MessageDescriptor::new(
        "test/Scalar",
        vec![FieldDescriptor::numeric("data", NumericType::Float32)],
    )
    .with_preferred_shape(OutputShape::DoubleMatrix)
    .into_arc();

    let mut conversion = Conversion::with_options(descriptor.instantiate(), Options::new());
    assert_eq!(conversion.output_shape(), OutputShape::DoubleMatrix);
    assert!(conversion.to_matlab().unwrap().is_double());
}

#[test]
fn test_conversion_without_message_fails() {
    let mut conversion = Conversion::for_type(sample_type());
    assert!(matches!(conversion.to_struct(), Err(BridgeError::Conversion(_))));
}

// ============================================================================
// Expansion
// ============================================================================

#[test]
fn test_expanded_splits_nested_arrays() {
    let mut path = path_type().instantiate();
    path.set("id", Leaf::UInt(7)).unwrap();
    path.set(
        "poses",
        FieldValue::Messages(vec![point(1.0, 0.0, 0.0), point(2.0, 0.0, 0.0), point(3.0, 0.0, 0.0)]),
    )
    .unwrap();

    let mut conversion = Conversion::with_options(path, Options::new());
    let expanded = conversion.expanded().unwrap();
    assert_eq!(expanded.len(), 3);
    for (i, message) in expanded.iter().enumerate() {
        assert_eq!(message.leaf("id"), Some(&Leaf::UInt(7)));
        let poses = message.get("poses").and_then(FieldValue::as_messages).unwrap();
        assert_eq!(poses.len(), 1);
        assert_eq!(poses[0].leaf("x"), Some(&Leaf::Float((i + 1) as f64)));
    }
}

#[test]
fn test_expanded_is_cartesian() {
    let point = point_type();
    let grid = MessageDescriptor::new(
        "test/Grid",
        vec![
            FieldDescriptor::message("rows", Arc::clone(&point)).repeated(),
            FieldDescriptor::message("cols", point).repeated(),
        ],
    )
    .into_arc();

    let mut message = grid.instantiate();
    message
        .set("rows", FieldValue::Messages(vec![self::point(0.0, 0.0, 0.0); 2]))
        .unwrap()
        .set("cols", FieldValue::Messages(vec![self::point(1.0, 1.0, 1.0); 3]))
        .unwrap();

    let mut conversion = Conversion::with_options(message, Options::new());
    assert_eq!(conversion.expanded().unwrap().len(), 6);
}

#[test]
fn test_expand_option_produces_one_element_per_instance() {
    let mut path = path_type().instantiate();
    path.set("poses", FieldValue::Messages(vec![point(1.0, 2.0, 3.0), point(4.0, 5.0, 6.0)]))
        .unwrap();

    let mut options = Options::new();
    options.set("expand", true);
    let mut conversion = Conversion::with_options(path, options);

    let result = conversion.to_struct().unwrap();
    assert_eq!(conversion.number_of_instances(&result), 2);
    let second = result.field(1, "poses").unwrap();
    assert_eq!(second.field(0, "x"), Some(&Array::double_scalar(4.0)));
}

#[test]
fn test_expansion_keeps_fixed_arrays_whole() {
    let mut conversion = Conversion::with_options(stamped(), Options::new());
    let expanded = conversion.expanded().unwrap().to_vec();
    assert_eq!(expanded, vec![stamped()]);

    let mut target = expanded[0].clone();
    let row = Array::double_matrix(1, 15, (0..15).map(f64::from).collect());
    Conversion::for_type(stamped_type())
        .from_matlab_into(&mut target, &row, 0)
        .unwrap();

    assert_eq!(target.get("corners").and_then(FieldValue::as_messages).map(<[Message]>::len), Some(2));
    assert_eq!(
        target.get("covariance"),
        Some(&FieldValue::Leaves(vec![Leaf::Float(12.0), Leaf::Float(13.0), Leaf::Float(14.0)]))
    );
}

#[test]
fn test_short_fixed_message_array_consumes_full_width() {
    let conversion = Conversion::for_type(stamped_type());
    let corners = stamped_type().field("corners").unwrap().clone();
    let mut value = FieldValue::Messages(vec![point(0.0, 0.0, 0.0)]);

    let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 99.0];
    let rest = conversion.convert_from_double(&mut value, &corners, &values);

    assert_eq!(rest, &[99.0]);
    assert_eq!(
        value,
        FieldValue::Messages(vec![point(1.0, 2.0, 3.0), point(4.0, 5.0, 6.0)])
    );
}

#[test]
fn test_message_without_arrays_expands_to_itself() {
    let mut conversion = Conversion::with_options(sample(1.0, &["a", "b"]), Options::new());
    let expanded = conversion.expanded().unwrap().to_vec();
    assert_eq!(expanded, vec![sample(1.0, &["a", "b"])]);
}

// ============================================================================
// Host to message
// ============================================================================

#[test]
fn test_struct_round_trip() {
    let original = sample(5.0, &["a", "b"]);
    let mut conversion = Conversion::with_options(original.clone(), Options::new());
    let host = conversion.to_struct().unwrap();

    let restored = conversion.from_matlab(&host, 0).unwrap();
    assert_eq!(restored, original);
}

#[test]
fn test_nested_struct_round_trip() {
    let original = stamped();
    let mut conversion = Conversion::with_options(original.clone(), Options::new());
    let host = conversion.to_struct().unwrap();

    assert_eq!(conversion.from_matlab(&host, 0).unwrap(), original);
}

#[test]
fn test_batch_and_index() {
    let messages = vec![sample(1.0, &["a"]), sample(2.0, &[]), sample(3.0, &["c", "d"])];
    let host = Conversion::to_struct_batch(&messages).unwrap();

    let conversion = Conversion::for_type(sample_type());
    assert_eq!(conversion.number_of_instances(&host), 3);
    assert_eq!(conversion.from_matlab(&host, 2).unwrap(), messages[2]);
    assert!(matches!(
        conversion.from_matlab(&host, 3),
        Err(BridgeError::InvalidArgument(_))
    ));
}

#[test]
fn test_double_matrix_batch_and_index() {
    let messages = vec![point(1.0, 2.0, 3.0), point(4.0, 5.0, 6.0), point(7.0, 8.0, 9.0)];
    let host = Conversion::to_double_matrix_batch(&messages).unwrap();
    assert_eq!(host.dims(), (3, 3));

    let conversion = Conversion::for_type(point_type());
    assert_eq!(conversion.number_of_instances(&host), 3);
    assert_eq!(conversion.from_matlab(&host, 1).unwrap(), messages[1]);
}

#[test]
fn test_partial_update_keeps_absent_fields() {
    let mut target = stamped();
    let source = struct_of(vec![
        ("count", Array::double_scalar(42.0)),
        ("position", struct_of(vec![("z", Array::double_scalar(-1.0))])),
    ]);

    let conversion = Conversion::for_type(stamped_type());
    conversion.from_matlab_into(&mut target, &source, 0).unwrap();

    assert_eq!(target.leaf("count"), Some(&Leaf::Int(42)));
    assert_eq!(target.leaf("label"), Some(&Leaf::from("base")));
    let position = target.get("position").and_then(FieldValue::as_message).unwrap();
    assert_eq!(position, &point(1.0, 2.0, -1.0));
}

#[test]
fn test_double_matrix_update_skips_strings() {
    let mut target = stamped();
    let row: Vec<f64> = (0..15).map(f64::from).collect();
    let source = Array::double_matrix(1, 15, row);

    Conversion::for_type(stamped_type())
        .from_matlab_into(&mut target, &source, 0)
        .unwrap();

    assert_eq!(target.leaf("stamp"), Some(&Leaf::Time(Time::ZERO)));
    assert_eq!(target.leaf("count"), Some(&Leaf::Int(1)));
    assert_eq!(target.leaf("flag"), Some(&Leaf::Bool(true)));
    assert_eq!(target.leaf("label"), Some(&Leaf::from("base")));
    let corners = target.get("corners").and_then(FieldValue::as_messages).unwrap();
    assert_eq!(corners[1], point(9.0, 10.0, 11.0));
    assert_eq!(
        target.get("covariance").and_then(FieldValue::as_leaves).unwrap(),
        &[Leaf::Float(12.0), Leaf::Float(13.0), Leaf::Float(14.0)]
    );
}

#[test]
fn test_short_row_leaves_trailing_fields() {
    let mut target = point(1.0, 2.0, 3.0);
    let source = Array::double_matrix(1, 2, vec![-1.0, -2.0]);

    Conversion::for_type(point_type())
        .from_matlab_into(&mut target, &source, 0)
        .unwrap();
    assert_eq!(target, point(-1.0, -2.0, 3.0));
}

#[test]
fn test_convert_from_double_advances_cursor() {
    let conversion = Conversion::for_type(stamped_type());
    let corners = stamped_type().field("corners").unwrap().clone();
    let mut value = corners.default_value();

    let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 99.0];
    let rest = conversion.convert_from_double(&mut value, &corners, &values);

    assert_eq!(rest, &[99.0]);
    assert_eq!(value.as_messages().unwrap()[1], point(4.0, 5.0, 6.0));

    // variable-length fields consume nothing
    let points = stamped_type().field("points").unwrap().clone();
    let mut value = points.default_value();
    assert_eq!(conversion.convert_from_double(&mut value, &points, &values).len(), 7);
}

#[test]
fn test_unreadable_leaf_becomes_default() {
    let conversion = Conversion::for_type(sample_type());
    let source = struct_of(vec![("x", Array::string("five")), ("names", Array::double_scalar(1.0))]);

    let message = conversion.from_matlab(&source, 0).unwrap();
    assert_eq!(message.leaf("x"), Some(&Leaf::Float(0.0)));
    assert_eq!(message.get("names"), Some(&FieldValue::Leaves(vec![])));
}

#[test]
fn test_empty_time_is_zero() {
    let conversion = Conversion::for_type(stamped_type());
    let stamp = stamped_type().field("stamp").unwrap().clone();

    assert_eq!(
        conversion.convert_from_matlab(&stamp, &Array::empty()).unwrap(),
        FieldValue::Leaf(Leaf::Time(Time::ZERO))
    );
    assert_eq!(
        conversion.convert_from_matlab(&stamp, &Array::double_scalar(2.5)).unwrap(),
        FieldValue::Leaf(Leaf::Time(Time::new(2, 500_000_000)))
    );
}

#[test]
fn test_huge_time_saturates() {
    let conversion = Conversion::for_type(stamped_type());
    let stamp = stamped_type().field("stamp").unwrap().clone();

    for seconds in [1e20, f64::INFINITY] {
        assert_eq!(
            conversion.convert_from_matlab(&stamp, &Array::double_scalar(seconds)).unwrap(),
            FieldValue::Leaf(Leaf::Time(Time::MAX))
        );
    }
    assert_eq!(
        conversion.convert_from_matlab(&stamp, &Array::double_scalar(f64::NEG_INFINITY)).unwrap(),
        FieldValue::Leaf(Leaf::Time(Time::ZERO))
    );

    let row = Array::double_matrix(1, 1, vec![1e20]);
    let message = conversion.from_matlab(&row, 0).unwrap();
    assert_eq!(message.leaf("stamp"), Some(&Leaf::Time(Time::MAX)));
}

#[test]
fn test_fixed_leaves_are_padded() {
    let conversion = Conversion::for_type(stamped_type());
    let covariance = stamped_type().field("covariance").unwrap().clone();

    let value = conversion
        .convert_from_matlab(&covariance, &Array::numeric_row(NumericClass::Double, vec![1.0]))
        .unwrap();
    assert_eq!(
        value,
        FieldValue::Leaves(vec![Leaf::Float(1.0), Leaf::Float(0.0), Leaf::Float(0.0)])
    );
}

#[test]
fn test_nested_field_requires_struct() {
    let conversion = Conversion::for_type(stamped_type());
    let source = struct_of(vec![("position", Array::double_scalar(1.0))]);

    assert!(matches!(
        conversion.from_matlab(&source, 0),
        Err(BridgeError::Conversion(_))
    ));
}

#[test]
fn test_non_struct_source_is_rejected() {
    let conversion = Conversion::for_type(sample_type());
    assert!(matches!(
        conversion.from_matlab(&Array::cell(vec![Array::empty()]), 0),
        Err(BridgeError::InvalidArgument(_))
    ));
    assert_eq!(conversion.number_of_instances(&Array::string("x")), 0);

    let err = conversion.from_matlab(&Array::string("x"), 0).unwrap_err();
    assert!(err.to_string().contains("cannot read a test/Sample message from a char array"), "{}", err);
    let err = conversion.from_matlab(&Array::cell(vec![]), 0).unwrap_err();
    assert!(!err.to_string().contains("out of range"), "{}", err);
}

#[test]
fn test_nested_array_from_cell_of_structs() {
    let conversion = Conversion::for_type(stamped_type());
    let points = stamped_type().field("points").unwrap().clone();

    let cells = Array::cell(vec![
        struct_of(vec![("x", Array::double_scalar(1.0))]),
        struct_of(vec![("y", Array::double_scalar(2.0))]),
    ]);
    let value = conversion.convert_from_matlab(&points, &cells).unwrap();
    assert_eq!(
        value,
        FieldValue::Messages(vec![point(1.0, 0.0, 0.0), point(0.0, 2.0, 0.0)])
    );
}

proptest! {
    #[test]
    fn prop_point_rows_read_back(x in -1e6f64..1e6, y in -1e6f64..1e6, z in -1e6f64..1e6) {
        let host = Conversion::to_double_matrix_batch(&[point(x, y, z)]).unwrap();
        let restored = Conversion::for_type(point_type()).from_matlab(&host, 0).unwrap();
        prop_assert_eq!(restored, point(x, y, z));
    }

    #[test]
    fn prop_int8_saturates(v in -1e4f64..1e4) {
        let Leaf::Int(i) = Leaf::from_f64(NumericType::Int8, v) else {
            panic!("int8 leaf expected");
        };
        prop_assert!((-128..=127).contains(&i));
    }
}
