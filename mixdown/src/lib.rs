pub mod document;
pub mod parser;
pub mod runtime;
pub mod snippet;
pub mod stringify;

pub use document::{Code, Compiled, Key, Node, Section, Text, Value, ValueKind};
pub use parser::{ParseError, Parser};
pub use runtime::{Array, Context, DiagnosticError, MixinError, NativeFunction, Object, RuntimeError, RuntimeValue};
pub use stringify::stringify;

/// Parse a mixdown document into its root section.
pub fn parse(source: &str) -> Result<Section, ParseError> {
    Parser::new(source).parse()
}
