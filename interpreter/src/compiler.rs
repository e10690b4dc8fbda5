use std::sync::Arc;

use mixdown::{
    Compiled, Context, DiagnosticError, Node, Object, RuntimeError, RuntimeValue, Section, Value,
    ValueKind,
};
use tracing::{debug, trace};

use crate::error::CompileError;
use crate::expression::{Evaluator, ExpressionEvaluator};
use crate::mixin::{apply_mixin, resolve_base, Path};

/// Turns parsed values into [`Compiled`] units bound to one source text.
#[derive(Clone)]
pub struct Compiler {
    source: Arc<str>,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl Compiler {
    /// A compiler using the built-in expression language.
    pub fn new(source: &str) -> Self {
        Compiler {
            source: Arc::from(source),
            evaluator: Arc::new(Evaluator),
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Replace every value in `section` (recursively) that is not compiled
    /// yet. Returns the number of values compiled.
    pub fn compile_document(&self, section: &mut Section) -> Result<usize, CompileError> {
        let count = self.compile_children(&mut section.children)?;
        debug!(values = count, section = %section.name, "compiled document");
        Ok(count)
    }

    fn compile_children(&self, children: &mut [Node]) -> Result<usize, CompileError> {
        let mut count = 0;
        for child in children {
            match child {
                Node::Section(section) => count += self.compile_children(&mut section.children)?,
                Node::Value(value) if !value.is_compiled() => {
                    value.kind = ValueKind::Compiled(self.compile_value(value)?);
                    count += 1;
                }
                _ => {}
            }
        }
        Ok(count)
    }

    /// Build the executable unit for `value`. Its `run` re-evaluates the whole
    /// value tree against the context it is given.
    pub fn compile_value(&self, value: &Value) -> Result<Compiled, CompileError> {
        let program = Program {
            plan: plan(value)?,
            source: Arc::clone(&self.source),
            evaluator: Arc::clone(&self.evaluator),
        };
        trace!(line = value.line, subtype = value.subtype(), "compiled value");
        Ok(Compiled::new(move |context| program.run(context)))
    }
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// A value tree with paths pre-parsed and positions kept only where
/// evaluation can fail.
#[derive(Debug)]
enum Plan {
    Array {
        elements: Vec<Plan>,
        unordered: bool,
    },
    Object {
        keys: Vec<(String, Plan)>,
    },
    Mixin {
        base: String,
        removals: Vec<Path>,
        additions: Vec<(Path, Plan)>,
        position: Position,
    },
    Expression {
        code: String,
        position: Position,
    },
}

/// The source region being evaluated.
#[derive(Debug, Clone, Copy)]
struct Position {
    line: usize,
    size: usize,
}

impl Default for Position {
    fn default() -> Self {
        Position { line: 1, size: 1 }
    }
}

fn plan(value: &Value) -> Result<Plan, CompileError> {
    let position = Position {
        line: value.line,
        size: value.size,
    };
    Ok(match &value.kind {
        ValueKind::Array { elements, unordered } => Plan::Array {
            elements: elements.iter().map(plan).collect::<Result<_, _>>()?,
            unordered: *unordered,
        },
        ValueKind::Object { keys } => Plan::Object {
            keys: keys
                .iter()
                .map(|key| Ok((key.name.clone(), plan(&key.value)?)))
                .collect::<Result<_, CompileError>>()?,
        },
        ValueKind::Mixin { base, removals, additions } => Plan::Mixin {
            base: base.clone(),
            removals: removals.iter().map(|path| Path::parse(path)).collect(),
            additions: additions
                .iter()
                .map(|key| Ok((Path::parse(&key.name), plan(&key.value)?)))
                .collect::<Result<_, CompileError>>()?,
            position,
        },
        ValueKind::Expression { code } => Plan::Expression {
            code: code.clone(),
            position,
        },
        ValueKind::Compiled(_) => return Err(CompileError::NestedCompiled { line: value.line }),
    })
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

struct Program {
    plan: Plan,
    source: Arc<str>,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl Program {
    fn run(&self, context: &Context) -> Result<RuntimeValue, DiagnosticError> {
        let mut position = Position::default();
        self.execute(&self.plan, context, &mut position).map_err(|error| {
            debug!(line = position.line, %error, "run failed");
            DiagnosticError::new(error, &self.source, position.line, position.size)
        })
    }

    /// Evaluate `plan`, recording in `position` each mixin or expression
    /// before it is evaluated.
    fn execute(
        &self,
        plan: &Plan,
        context: &Context,
        position: &mut Position,
    ) -> Result<RuntimeValue, RuntimeError> {
        match plan {
            Plan::Array { elements, unordered } => {
                let items = elements
                    .iter()
                    .map(|element| self.execute(element, context, position))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(RuntimeValue::array(items, *unordered))
            }

            Plan::Object { keys } => {
                let mut object = Object::new();
                for (name, value) in keys {
                    object.insert(name.clone(), self.execute(value, context, position)?);
                }
                Ok(RuntimeValue::Object(object))
            }

            Plan::Mixin { base, removals, additions, position: at } => {
                let additions = additions
                    .iter()
                    .map(|(path, value)| Ok((path.clone(), self.execute(value, context, position)?)))
                    .collect::<Result<Vec<_>, RuntimeError>>()?;
                *position = *at;
                let base = resolve_base(context, base)?;
                trace!(line = at.line, "applying mixin");
                Ok(apply_mixin(base, removals, &additions)?)
            }

            Plan::Expression { code, position: at } => {
                *position = *at;
                self.evaluator.evaluate(code, context)
            }
        }
    }
}
