mod context;
mod error;

pub use context::Context;
pub use error::{DiagnosticError, MixinError, RuntimeError};

use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// A concrete value produced by running a compiled value, or supplied
/// through a [`Context`].
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeValue {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Array(Array),
    Object(Object),
    /// Native callable. Shared, never deep-copied.
    Function(NativeFunction),
}

/// A sequence tagged with whether its element order is significant.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Array {
    pub items: Vec<RuntimeValue>,
    /// Set for `@` arrays: consumers may compare elements in any order.
    pub unordered: bool,
}

impl Array {
    pub fn new(items: Vec<RuntimeValue>, unordered: bool) -> Self {
        Array { items, unordered }
    }
}

/// An insertion-ordered mapping. Inserting an existing key overwrites it in
/// place.
#[derive(Debug, Clone, Default)]
pub struct Object {
    entries: Vec<(String, RuntimeValue)>,
}

impl Object {
    pub fn new() -> Self {
        Object::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&RuntimeValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut RuntimeValue> {
        self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: RuntimeValue) {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<RuntimeValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuntimeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

// Key order is not significant for equality.
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K: Into<String>> FromIterator<(K, RuntimeValue)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, RuntimeValue)>>(iter: I) -> Self {
        let mut object = Object::new();
        for (key, value) in iter {
            object.insert(key, value);
        }
        object
    }
}

type NativeFn = dyn Fn(&[RuntimeValue]) -> Result<RuntimeValue, RuntimeError> + Send + Sync;

/// A named native callable, e.g. one of the random helpers.
#[derive(Clone)]
pub struct NativeFunction {
    name: Arc<str>,
    func: Arc<NativeFn>,
}

impl NativeFunction {
    pub fn new(
        name: &str,
        func: impl Fn(&[RuntimeValue]) -> Result<RuntimeValue, RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        NativeFunction {
            name: Arc::from(name),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, arguments: &[RuntimeValue]) -> Result<RuntimeValue, RuntimeError> {
        (self.func)(arguments)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.func), Arc::as_ptr(&other.func))
    }
}

impl RuntimeValue {
    pub fn array(items: Vec<RuntimeValue>, unordered: bool) -> Self {
        RuntimeValue::Array(Array::new(items, unordered))
    }

    pub fn function(
        name: &str,
        func: impl Fn(&[RuntimeValue]) -> Result<RuntimeValue, RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        RuntimeValue::Function(NativeFunction::new(name, func))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            RuntimeValue::Null => "null",
            RuntimeValue::Boolean(_) => "boolean",
            RuntimeValue::Number(_) => "number",
            RuntimeValue::String(_) => "string",
            RuntimeValue::Array(_) => "array",
            RuntimeValue::Object(_) => "object",
            RuntimeValue::Function(_) => "function",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            RuntimeValue::Null => false,
            RuntimeValue::Boolean(b) => *b,
            RuntimeValue::Number(n) => *n != 0.0 && !n.is_nan(),
            RuntimeValue::String(s) => !s.is_empty(),
            RuntimeValue::Array(_) | RuntimeValue::Object(_) | RuntimeValue::Function(_) => true,
        }
    }

    /// True for arrays and objects, the only valid mixin bases.
    pub fn is_structured(&self) -> bool {
        matches!(self, RuntimeValue::Array(_) | RuntimeValue::Object(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            RuntimeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RuntimeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            RuntimeValue::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            RuntimeValue::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Serialize to a `serde_json::Value`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Integral numbers render without a fractional part.
fn integral(n: f64) -> Option<i64> {
    if n.is_finite() && n == n.floor() && n.abs() < 1e15 {
        Some(n as i64)
    } else {
        None
    }
}

impl fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeValue::Null => write!(f, "null"),
            RuntimeValue::Boolean(b) => write!(f, "{}", b),
            RuntimeValue::Number(n) => match integral(*n) {
                Some(i) => write!(f, "{}", i),
                None if n.is_nan() => write!(f, "NaN"),
                None if n.is_infinite() => {
                    write!(f, "{}", if *n > 0.0 { "Infinity" } else { "-Infinity" })
                }
                None => write!(f, "{}", n),
            },
            RuntimeValue::String(s) => write!(f, "{}", s),
            RuntimeValue::Array(array) => {
                for (i, item) in array.items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    if !matches!(item, RuntimeValue::Null) {
                        write!(f, "{}", item)?;
                    }
                }
                Ok(())
            }
            RuntimeValue::Object(_) => write!(f, "[object Object]"),
            RuntimeValue::Function(func) => write!(f, "[Function {}]", func.name()),
        }
    }
}

impl Serialize for RuntimeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RuntimeValue::Null => serializer.serialize_unit(),
            RuntimeValue::Boolean(b) => serializer.serialize_bool(*b),
            RuntimeValue::Number(n) => match integral(*n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            RuntimeValue::String(s) => serializer.serialize_str(s),
            RuntimeValue::Array(array) => {
                let mut seq = serializer.serialize_seq(Some(array.items.len()))?;
                for item in &array.items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            RuntimeValue::Object(object) => {
                let mut map = serializer.serialize_map(Some(object.len()))?;
                for (key, value) in object.iter() {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            RuntimeValue::Function(func) => {
                serializer.serialize_str(&format!("[Function {}]", func.name()))
            }
        }
    }
}

impl From<serde_json::Value> for RuntimeValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => RuntimeValue::Null,
            serde_json::Value::Bool(b) => RuntimeValue::Boolean(b),
            serde_json::Value::Number(n) => RuntimeValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => RuntimeValue::String(s),
            serde_json::Value::Array(items) => {
                RuntimeValue::array(items.into_iter().map(RuntimeValue::from).collect(), false)
            }
            serde_json::Value::Object(map) => RuntimeValue::Object(
                map.into_iter()
                    .map(|(key, value)| (key, RuntimeValue::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for RuntimeValue {
    fn from(b: bool) -> Self {
        RuntimeValue::Boolean(b)
    }
}

impl From<f64> for RuntimeValue {
    fn from(n: f64) -> Self {
        RuntimeValue::Number(n)
    }
}

impl From<&str> for RuntimeValue {
    fn from(s: &str) -> Self {
        RuntimeValue::String(s.to_string())
    }
}

impl From<String> for RuntimeValue {
    fn from(s: String) -> Self {
        RuntimeValue::String(s)
    }
}

impl From<Object> for RuntimeValue {
    fn from(object: Object) -> Self {
        RuntimeValue::Object(object)
    }
}

impl From<Array> for RuntimeValue {
    fn from(array: Array) -> Self {
        RuntimeValue::Array(array)
    }
}
