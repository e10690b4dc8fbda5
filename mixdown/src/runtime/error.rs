use thiserror::Error;

use crate::snippet;

/// Failures raised while running a compiled value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("{0} is not defined")]
    UndefinedVariable(String),

    #[error("{0} is not a function")]
    NotCallable(String),

    #[error("cannot read property '{property}' of {target}")]
    InvalidProperty { property: String, target: String },

    #[error("{target} has no method '{method}'")]
    UnknownMethod { method: String, target: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("syntax error in expression: {0}")]
    Syntax(String),

    #[error("expression nesting too deep")]
    StackOverflow,

    #[error(transparent)]
    Mixin(#[from] MixinError),

    #[error("{0}")]
    Custom(String),
}

/// Structural failures of the mixin engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MixinError {
    #[error("expected base of mixin to be a non-null object, got {got}")]
    InvalidBase { got: String },

    #[error("can't resolve '{segment}' in mixin base {base}")]
    UnresolvedBase { base: String, segment: String },

    #[error("can't remove key {key} from non-object")]
    RemoveFromNonObject { key: String },

    #[error("can't remove index {index} from an array with {len} elements")]
    RemoveIndexOutOfRange { index: usize, len: usize },

    #[error("can't remove the numeric key {index} from an object")]
    RemoveNumericKey { index: usize },

    #[error("can't remove key {key} from the object")]
    MissingKey { key: String },

    #[error("can't add key {key} to non-object")]
    AddToNonObject { key: String },

    #[error("can't add index {index} to an array with {len} elements")]
    AddIndexOutOfRange { index: usize, len: usize },

    #[error("can't add the numeric key {index} to an object")]
    AddNumericKey { index: usize },

    #[error("empty path")]
    EmptyPath,
}

/// A runtime error annotated with the source region being evaluated when it
/// was raised. `Display` yields the message followed by the snippet, ready to
/// print.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}\n{snippet}")]
pub struct DiagnosticError {
    #[source]
    pub error: RuntimeError,
    pub line: usize,
    pub size: usize,
    pub snippet: String,
}

impl DiagnosticError {
    pub fn new(error: RuntimeError, source: &str, line: usize, size: usize) -> Self {
        DiagnosticError {
            error,
            line,
            size,
            snippet: snippet::extract(source, line, size),
        }
    }
}
