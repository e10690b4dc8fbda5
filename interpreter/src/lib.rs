pub mod compiler;
pub mod error;
pub mod expression;
pub mod helpers;
pub mod mixin;

pub use compiler::Compiler;
pub use error::{CompileError, Error};
pub use expression::{Evaluator, ExpressionEvaluator};
pub use helpers::base_context;
pub use mixin::apply_mixin;

use mixdown::Section;

/// Parse `source` (unless `tree` is given) and compile every value in the
/// tree that is not compiled yet.
pub fn compile(source: &str, tree: Option<Section>) -> Result<Section, Error> {
    let mut tree = match tree {
        Some(tree) => tree,
        None => mixdown::parse(source)?,
    };
    Compiler::new(source).compile_document(&mut tree)?;
    Ok(tree)
}
