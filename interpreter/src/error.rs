use mixdown::ParseError;
use thiserror::Error;

/// A value tree that cannot be turned into an executable unit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// Compiled values are only valid as the root of a value tree.
    #[error("value at line {line} contains an already compiled value")]
    NestedCompiled { line: usize },
}

/// Everything [`crate::compile`] can fail with.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}
