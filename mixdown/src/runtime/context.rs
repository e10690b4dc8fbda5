use std::collections::HashMap;

use crate::runtime::RuntimeValue;

/// Named bindings visible to expressions and mixin bases during a run.
#[derive(Debug, Clone, Default)]
pub struct Context {
    bindings: HashMap<String, RuntimeValue>,
}

impl Context {
    pub fn new() -> Self {
        Context::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<RuntimeValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RuntimeValue>) {
        self.bindings.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&RuntimeValue> {
        self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Layer `other` over this context; its bindings win on conflict.
    pub fn extend(&mut self, other: Context) {
        self.bindings.extend(other.bindings);
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Context {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Context {
            bindings: map
                .into_iter()
                .map(|(name, value)| (name, RuntimeValue::from(value)))
                .collect(),
        }
    }
}

impl<K: Into<String>> FromIterator<(K, RuntimeValue)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, RuntimeValue)>>(iter: I) -> Self {
        Context {
            bindings: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }
}
