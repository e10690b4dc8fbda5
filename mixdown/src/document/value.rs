use std::fmt;
use std::sync::Arc;

use crate::runtime::{Context, DiagnosticError, RuntimeValue};

/// A value block, or a value nested inside one.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    /// 1-based start line in the original source.
    pub line: usize,
    /// Number of source lines covered.
    pub size: usize,
    /// Retained original text. For a top-level block this is the block as
    /// written, leading tabs included.
    pub content: String,
    pub kind: ValueKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    /// `*` (ordered) or `@` (unordered) marked elements.
    Array { elements: Vec<Value>, unordered: bool },
    /// `key: value` entries in source order.
    Object { keys: Vec<Key> },
    /// `base without a, b.c; with path: value`
    Mixin {
        /// Dotted lookup path into the runtime context.
        base: String,
        /// Dotted paths, without duplicates.
        removals: Vec<String>,
        /// Dotted paths paired with their values.
        additions: Vec<Key>,
    },
    /// Opaque expression text.
    Expression { code: String },
    /// Executable unit produced by compilation.
    Compiled(Compiled),
}

/// An object entry, or a mixin addition whose name is a dotted path.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    pub name: String,
    pub value: Value,
}

impl Value {
    pub fn subtype(&self) -> &'static str {
        match self.kind {
            ValueKind::Array { .. } => "array",
            ValueKind::Object { .. } => "object",
            ValueKind::Mixin { .. } => "mixin",
            ValueKind::Expression { .. } => "expression",
            ValueKind::Compiled(_) => "compiled",
        }
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self.kind, ValueKind::Compiled(_))
    }

    /// The executable unit, once this value has been compiled.
    pub fn compiled(&self) -> Option<&Compiled> {
        match &self.kind {
            ValueKind::Compiled(compiled) => Some(compiled),
            _ => None,
        }
    }
}

type RunFn = dyn Fn(&Context) -> Result<RuntimeValue, DiagnosticError> + Send + Sync;

/// A compiled value: re-derives its output from a context on every call.
/// Cheap to clone and safe to run from several threads at once.
#[derive(Clone)]
pub struct Compiled {
    run: Arc<RunFn>,
}

impl Compiled {
    pub fn new(
        run: impl Fn(&Context) -> Result<RuntimeValue, DiagnosticError> + Send + Sync + 'static,
    ) -> Self {
        Compiled { run: Arc::new(run) }
    }

    pub fn run(&self, context: &Context) -> Result<RuntimeValue, DiagnosticError> {
        (self.run)(context)
    }
}

impl fmt::Debug for Compiled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Compiled(..)")
    }
}

impl PartialEq for Compiled {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.run), Arc::as_ptr(&other.run))
    }
}
