//! Argument bag tests

use super::*;
use crate::core::NumericClass;
use proptest::prelude::*;

fn s(value: &str) -> Array {
    Array::string(value)
}

#[test]
fn test_on_off_derive_logicals() {
    let mut options = Options::new();
    options.set("latch", "on");
    options.set("queue", "OFF");

    assert!(options.get_bool("latch", false));
    assert!(!options.get_bool("queue", true));
    assert_eq!(options.get_string("latch", ""), "on");
}

#[test]
fn test_other_strings_leave_bool_default() {
    let mut options = Options::new();
    options.set("mode", "fast");

    assert!(options.get_bool("mode", true));
    assert!(!options.get_bool("mode", false));
    // the failed logical read does not count as consuming the key
    assert_eq!(options.unused(), vec!["mode".to_string()]);
}

#[test]
fn test_integer_widens_from_double() {
    let mut options = Options::new();
    options.set("n", 3.5);

    assert_eq!(options.get::<i64>("n", -1), 3);
    assert_eq!(options.get::<i64>("missing", -1), -1);
    assert!(options.get_bool("n", false));
}

#[test]
fn test_init_from_pairs_with_default() {
    let inputs = vec![
        s("/chatter"),
        s("Latch"),
        Array::logical_scalar(true),
        s("QueueSize"),
        Array::scalar(NumericClass::Int32, 10.0),
        Array::double_scalar(1.0),
        s("ignored"),
    ];
    let options = Options::from_args(&inputs, true);

    assert_eq!(options.get_string("", ""), "/chatter");
    assert!(options.get_bool("latch", false));
    assert_eq!(options.get_integer("queuesize", 0), 10);
    // non-string keys are skipped
    assert_eq!(options.len(), 3);
}

#[test]
fn test_init_from_struct() {
    let mut source = Array::struct_array(&["Topic", "rate"], 1);
    source.set_field(0, "Topic", s("/odom")).unwrap();
    source.set_field(0, "rate", Array::double_scalar(50.0)).unwrap();

    let options = Options::from_args(&[source], false);
    assert_eq!(options.get_string("Topic", ""), "/odom");
    assert_eq!(options.get_double("rate", 0.0), 50.0);
    assert!(!options.has_key("topic"));
}

#[test]
fn test_init_flattens_cells() {
    let inner = Array::cell(vec![s("b"), Array::double_scalar(2.0)]);
    let outer = Array::cell(vec![inner]);
    let options = Options::from_args(&[outer], true);

    assert_eq!(options.get_double("b", 0.0), 2.0);
}

#[test]
fn test_cell_value_collects_elements() {
    let mut options = Options::new();
    options.set_array("names", Array::cell(vec![s("a"), s("b")]));

    assert_eq!(options.get_strings("names"), &["a".to_string(), "b".to_string()]);
    assert!(options.get_array("names").is_some_and(Array::is_cell));
}

#[test]
fn test_set_replaces_add_appends() {
    let mut options = Options::new();
    options.set_double("x", 1.0).set_double("x", 2.0);
    assert_eq!(options.get_doubles("x"), &[2.0]);

    options.add_double("x", 3.0);
    assert_eq!(options.get_doubles("x"), &[2.0, 3.0]);
    assert_eq!(options.get_double("x", 0.0), 2.0);
}

#[test]
fn test_set_array_keeps_other_kinds() {
    let mut options = Options::new();
    options.set_integer("k", 7).set_double("k", 2.5).set_string("k", "first");
    options.set_array("k", s("chatter"));

    assert_eq!(options.get_string("k", "<default>"), "chatter");
    assert_eq!(options.get_integer("k", -1), 7);
    assert_eq!(options.get_double("k", 0.0), 2.5);
    assert_eq!(options.get_array("k"), Some(&s("chatter")));
}

#[test]
fn test_unused_reporting() {
    let mut options = Options::new();
    options.set("a", 1.0).set("b", "x").set("c", true);

    options.get_double("a", 0.0);
    options.get_bool("c", false);
    assert_eq!(options.warn_unused(), vec!["b".to_string()]);
    assert_eq!(
        options.throw_on_unused(),
        Err(BridgeError::UnknownArgument { kind: "string".into(), key: "b".into() })
    );

    options.get_string("b", "");
    assert!(options.warn_unused().is_empty());
    assert!(options.throw_on_unused().is_ok());
}

#[test]
fn test_merge_overlays_and_resets_consumption() {
    let mut base = Options::new();
    base.set("rate", 10.0).set("topic", "/a");
    base.get_double("rate", 0.0);
    base.get_string("topic", "");

    let mut overlay = Options::new();
    overlay.set("rate", 20.0);
    base.merge(&overlay);

    assert!(!base.is_used("rate"));
    assert!(base.is_used("topic"));
    assert_eq!(base.get_double("rate", 0.0), 20.0);
    assert_eq!(base.get_string("topic", ""), "/a");
}

#[test]
fn test_clear() {
    let mut options = Options::new();
    options.set("a", 1.0);
    options.clear();
    assert!(options.is_empty());
    assert!(!options.has_key("a"));
    assert!(options.unused().is_empty());
}

proptest! {
    #[test]
    fn prop_switch_strings_any_case(upper in proptest::collection::vec(any::<bool>(), 3)) {
        let word: String = "off"
            .chars()
            .zip(upper.iter())
            .map(|(c, &u)| if u { c.to_ascii_uppercase() } else { c })
            .collect();

        let mut options = Options::new();
        options.set("flag", word.as_str());
        prop_assert!(!options.get_bool("flag", true));
    }
}
