//! Argument bag
//!
//! Collects the key/value arguments of one host call. Every key owns a small
//! set of typed slots (raw array, strings, doubles, integers, logicals) so a
//! single host value can be read back as whichever kind the caller asks for:
//! the string `"on"` is also the logical `true`, a double scalar also answers
//! integer and logical reads.
//!
//! Reads mark their key as consumed. [`Options::warn_unused`] and
//! [`Options::throw_on_unused`] report the keys nobody asked for.

use crate::core::{Array, Value, ValueKind};
use crate::errors::{BridgeError, BridgeResult};
use crate::infrastructure::logging::log_unused_argument;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

type Slot<T> = SmallVec<[T; 1]>;

/// Typed slots of one key
#[derive(Debug, Clone, Default, PartialEq)]
struct Entry {
    array: Option<Array>,
    strings: Slot<String>,
    doubles: Slot<f64>,
    integers: Slot<i64>,
    bools: Slot<bool>,
}

impl Entry {
    fn from_array(array: Array) -> Self {
        let mut entry = Entry::default();
        entry.absorb(&array);
        entry.array = Some(array);
        entry
    }

    /// Derive every typed reading of `value`, recursing into cells
    fn absorb(&mut self, value: &Array) {
        if let Some(s) = value.as_string() {
            self.strings.push(s.to_string());
            if let Some(b) = parse_switch(s) {
                self.bools.push(b);
            }
        }

        if value.is_double_scalar() {
            self.doubles.push(value.double_scalar_value());
        }
        if value.is_integer_scalar() {
            self.integers.push(value.integer_scalar_value());
        }
        if value.is_logical_scalar() {
            self.bools.push(value.logical_scalar_value());
        }

        if let Some(elements) = value.cell_elements() {
            for element in elements {
                self.absorb(element);
            }
        }
    }

    /// Kinds present, in reporting order
    fn kinds(&self) -> impl Iterator<Item = ValueKind> + '_ {
        [
            (!self.strings.is_empty()).then_some(ValueKind::String),
            (!self.doubles.is_empty()).then_some(ValueKind::Float),
            (!self.integers.is_empty()).then_some(ValueKind::Int),
            (!self.bools.is_empty()).then_some(ValueKind::Bool),
            self.array.is_some().then_some(ValueKind::Array),
        ]
        .into_iter()
        .flatten()
    }

    fn is_empty(&self) -> bool {
        self.kinds().next().is_none()
    }

    /// Replace every kind `other` carries
    fn overlay(&mut self, other: &Entry) {
        if other.array.is_some() {
            self.array = other.array.clone();
        }
        if !other.strings.is_empty() {
            self.strings = other.strings.clone();
        }
        if !other.doubles.is_empty() {
            self.doubles = other.doubles.clone();
        }
        if !other.integers.is_empty() {
            self.integers = other.integers.clone();
        }
        if !other.bools.is_empty() {
            self.bools = other.bools.clone();
        }
    }
}

/// Case-insensitive "on"/"off"
fn parse_switch(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("on") {
        Some(true)
    } else if s.eq_ignore_ascii_case("off") {
        Some(false)
    } else {
        None
    }
}

/// Call-scoped argument bag
#[derive(Debug, Clone, Default)]
pub struct Options {
    entries: BTreeMap<String, Entry>,
    used: RefCell<BTreeSet<String>>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from host call arguments
    pub fn from_args(inputs: &[Array], lowercase_keys: bool) -> Self {
        let mut options = Self::new();
        options.init(inputs, lowercase_keys);
        options
    }

    /// Accepts a single struct (fields become keys), a single cell (flattened
    /// recursively), or a key/value list where an odd leading element is the
    /// default value stored under the empty key.
    pub fn init(&mut self, inputs: &[Array], lowercase_keys: bool) {
        if let [single] = inputs {
            if let Some(fields) = single.field_names() {
                for name in fields {
                    let value = single.field(0, name).cloned().unwrap_or_default();
                    self.set_array(normalize_key(name, lowercase_keys), value);
                }
                return;
            }

            if let Some(elements) = single.cell_elements() {
                let elements = elements.to_vec();
                self.init(&elements, lowercase_keys);
                return;
            }
        }

        let mut rest = inputs;
        if rest.len() % 2 != 0 {
            self.set_array(String::new(), rest[0].clone());
            rest = &rest[1..];
        }

        for pair in rest.chunks_exact(2) {
            let Some(key) = pair[0].as_string() else {
                continue;
            };
            self.set_array(normalize_key(key, lowercase_keys), pair[1].clone());
        }
    }

    /// Overlay `other` per key and kind; overlaid keys become unread again
    pub fn merge(&mut self, other: &Options) {
        let mut used = self.used.borrow_mut();
        for (key, entry) in &other.entries {
            self.entries.entry(key.clone()).or_default().overlay(entry);
            used.remove(key);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.used.borrow_mut().clear();
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.entries.get(key).is_some_and(|entry| !entry.is_empty())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ------------------------------------------------------------------
    // Writers
    // ------------------------------------------------------------------

    /// Store a tagged value under `key`, replacing that kind
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let key = key.into();
        match value.into() {
            Value::String(s) => self.set_string(key, s),
            Value::Float(v) => self.set_double(key, v),
            Value::Int(v) => self.set_integer(key, v),
            Value::Bool(v) => self.set_bool(key, v),
            Value::Array(a) => self.set_array(key, a),
        }
    }

    /// Store a raw host array and every typed reading derived from it
    ///
    /// Only the kinds `value` yields are replaced; other kinds under `key`
    /// are kept.
    pub fn set_array(&mut self, key: impl Into<String>, value: Array) -> &mut Self {
        let derived = Entry::from_array(value);
        self.entries.entry(key.into()).or_default().overlay(&derived);
        self
    }

    /// Strings equal to "on"/"off" (any case) also set the logical slot
    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        let entry = self.entries.entry(key.into()).or_default();
        if let Some(b) = parse_switch(&value) {
            entry.bools = SmallVec::from_elem(b, 1);
        }
        entry.strings = SmallVec::from_elem(value, 1);
        self
    }

    pub fn set_double(&mut self, key: impl Into<String>, value: f64) -> &mut Self {
        self.entries.entry(key.into()).or_default().doubles = SmallVec::from_elem(value, 1);
        self
    }

    pub fn set_integer(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.entries.entry(key.into()).or_default().integers = SmallVec::from_elem(value, 1);
        self
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) -> &mut Self {
        self.entries.entry(key.into()).or_default().bools = SmallVec::from_elem(value, 1);
        self
    }

    pub fn add_string(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.entry(key.into()).or_default().strings.push(value.into());
        self
    }

    pub fn add_double(&mut self, key: impl Into<String>, value: f64) -> &mut Self {
        self.entries.entry(key.into()).or_default().doubles.push(value);
        self
    }

    pub fn add_integer(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.entries.entry(key.into()).or_default().integers.push(value);
        self
    }

    pub fn add_bool(&mut self, key: impl Into<String>, value: bool) -> &mut Self {
        self.entries.entry(key.into()).or_default().bools.push(value);
        self
    }

    // ------------------------------------------------------------------
    // Readers
    // ------------------------------------------------------------------

    /// First value of kind `T` under `key`, or `default`
    ///
    /// Only a successful read marks the key as consumed.
    pub fn get<T: OptionValue>(&self, key: &str, default: T) -> T {
        T::read(self, key).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.get(key, default.to_string())
    }

    pub fn get_double(&self, key: &str, default: f64) -> f64 {
        self.get(key, default)
    }

    pub fn get_integer(&self, key: &str, default: i64) -> i64 {
        self.get(key, default)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key, default)
    }

    /// The raw host array stored under `key`
    pub fn get_array(&self, key: &str) -> Option<&Array> {
        let array = self.entries.get(key)?.array.as_ref()?;
        self.mark_used(key);
        Some(array)
    }

    pub fn get_strings(&self, key: &str) -> &[String] {
        self.slot(key, |entry| &entry.strings)
    }

    pub fn get_doubles(&self, key: &str) -> &[f64] {
        self.slot(key, |entry| &entry.doubles)
    }

    pub fn get_integers(&self, key: &str) -> &[i64] {
        self.slot(key, |entry| &entry.integers)
    }

    pub fn get_bools(&self, key: &str) -> &[bool] {
        self.slot(key, |entry| &entry.bools)
    }

    fn slot<'a, T>(&'a self, key: &str, pick: impl Fn(&'a Entry) -> &'a Slot<T>) -> &'a [T] {
        match self.entries.get(key).map(pick) {
            Some(values) if !values.is_empty() => {
                self.mark_used(key);
                values.as_slice()
            }
            _ => &[],
        }
    }

    fn first<'a, T>(&'a self, key: &str, pick: impl Fn(&'a Entry) -> &'a Slot<T>) -> Option<&'a T> {
        let value = pick(self.entries.get(key)?).first()?;
        self.mark_used(key);
        Some(value)
    }

    fn mark_used(&self, key: &str) {
        self.used.borrow_mut().insert(key.to_string());
    }

    pub fn is_used(&self, key: &str) -> bool {
        self.used.borrow().contains(key)
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Keys never read, in key order
    pub fn unused(&self) -> Vec<String> {
        let used = self.used.borrow();
        self.entries
            .iter()
            .filter(|(key, entry)| !entry.is_empty() && !used.contains(*key))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Emit a warning per unused key and kind; returns the unused keys
    pub fn warn_unused(&self) -> Vec<String> {
        let unused = self.unused();
        for key in &unused {
            for kind in self.entries[key].kinds() {
                log_unused_argument(&kind.to_string(), key);
            }
        }
        unused
    }

    /// Fail on the first unused key
    pub fn throw_on_unused(&self) -> BridgeResult<()> {
        let Some(key) = self.unused().into_iter().next() else {
            return Ok(());
        };
        let kind = self.entries[&key]
            .kinds()
            .next()
            .unwrap_or(ValueKind::Array)
            .to_string();
        Err(BridgeError::UnknownArgument { kind, key })
    }

    /// `throw_on_unused` when `strict`, otherwise `warn_unused`
    pub fn check_unused(&self, strict: bool) -> BridgeResult<()> {
        if strict {
            self.throw_on_unused()
        } else {
            self.warn_unused();
            Ok(())
        }
    }
}

fn normalize_key(key: &str, lowercase: bool) -> String {
    if lowercase {
        key.to_lowercase()
    } else {
        key.to_string()
    }
}

/// A kind that can be read out of an [`Options`] bag
pub trait OptionValue: Sized {
    fn read(options: &Options, key: &str) -> Option<Self>;
}

impl OptionValue for String {
    fn read(options: &Options, key: &str) -> Option<Self> {
        options.first(key, |e| &e.strings).cloned()
    }
}

impl OptionValue for f64 {
    fn read(options: &Options, key: &str) -> Option<Self> {
        options.first(key, |e| &e.doubles).copied()
    }
}

/// Falls back to a stored double
impl OptionValue for i64 {
    fn read(options: &Options, key: &str) -> Option<Self> {
        options
            .first(key, |e| &e.integers)
            .copied()
            .or_else(|| options.first(key, |e| &e.doubles).map(|&d| d as i64))
    }
}

impl OptionValue for i32 {
    fn read(options: &Options, key: &str) -> Option<Self> {
        i64::read(options, key).map(|v| v as i32)
    }
}

impl OptionValue for usize {
    fn read(options: &Options, key: &str) -> Option<Self> {
        i64::read(options, key).map(|v| v.max(0) as usize)
    }
}

/// Falls back to a stored double (non-zero is true)
impl OptionValue for bool {
    fn read(options: &Options, key: &str) -> Option<Self> {
        options
            .first(key, |e| &e.bools)
            .copied()
            .or_else(|| options.first(key, |e| &e.doubles).map(|&d| d != 0.0))
    }
}

impl OptionValue for Array {
    fn read(options: &Options, key: &str) -> Option<Self> {
        options.get_array(key).cloned()
    }
}

#[cfg(test)]
mod tests;
