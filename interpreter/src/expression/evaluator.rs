use std::mem;

use mixdown::{Array, Context, Object, RuntimeError, RuntimeValue};

use super::{BinaryOperator, Expr, UnaryOperator};

const MAX_DEPTH: usize = 256;

/// Evaluate an expression AST against `context`.
pub fn evaluate(expr: &Expr, context: &Context, depth: usize) -> Result<RuntimeValue, RuntimeError> {
    if depth > MAX_DEPTH {
        return Err(RuntimeError::StackOverflow);
    }

    match expr {
        // --- Literals ---
        Expr::Null => Ok(RuntimeValue::Null),
        Expr::Boolean(b) => Ok(RuntimeValue::Boolean(*b)),
        Expr::Number(n) => Ok(RuntimeValue::Number(*n)),
        Expr::String(s) => Ok(RuntimeValue::String(s.clone())),

        Expr::Array(items) => {
            let items = items
                .iter()
                .map(|item| evaluate(item, context, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(RuntimeValue::array(items, false))
        }

        Expr::Object(entries) => {
            let mut object = Object::new();
            for (key, value) in entries {
                object.insert(key.clone(), evaluate(value, context, depth + 1)?);
            }
            Ok(RuntimeValue::Object(object))
        }

        // --- References ---
        Expr::Identifier(name) => context
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone())),

        Expr::Member { object, property } => {
            let target = evaluate(object, context, depth + 1)?;
            get_property(&target, property)
        }

        Expr::Index { object, index } => {
            let target = evaluate(object, context, depth + 1)?;
            let key = evaluate(index, context, depth + 1)?;
            get_property(&target, &key.to_string())
        }

        Expr::Call { callee, arguments } => {
            let arguments = arguments
                .iter()
                .map(|argument| evaluate(argument, context, depth + 1))
                .collect::<Result<Vec<_>, _>>()?;

            match callee.as_ref() {
                Expr::Member { object, property } => {
                    let target = evaluate(object, context, depth + 1)?;
                    call_method(&target, property, &arguments)
                }
                other => match evaluate(other, context, depth + 1)? {
                    RuntimeValue::Function(func) => func.call(&arguments),
                    _ => Err(RuntimeError::NotCallable(describe(other))),
                },
            }
        }

        // --- Operations ---
        Expr::Unary { operator, operand } => {
            let value = evaluate(operand, context, depth + 1)?;
            match operator {
                UnaryOperator::Negation => Ok(RuntimeValue::Number(-coerce_number(&value)?)),
                UnaryOperator::LogicalNot => Ok(RuntimeValue::Boolean(!value.is_truthy())),
            }
        }

        Expr::Binary { operator, left, right } => {
            let l = evaluate(left, context, depth + 1)?;
            // Short-circuit operators yield one of their operands.
            match operator {
                BinaryOperator::LogicalAnd if !l.is_truthy() => return Ok(l),
                BinaryOperator::LogicalOr if l.is_truthy() => return Ok(l),
                BinaryOperator::LogicalAnd | BinaryOperator::LogicalOr => {
                    return evaluate(right, context, depth + 1);
                }
                _ => {}
            }
            let r = evaluate(right, context, depth + 1)?;
            eval_binary_op(operator, &l, &r)
        }

        Expr::Conditional { condition, then, otherwise } => {
            if evaluate(condition, context, depth + 1)?.is_truthy() {
                evaluate(then, context, depth + 1)
            } else {
                evaluate(otherwise, context, depth + 1)
            }
        }
    }
}

/// How a non-callable callee is named in error messages.
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(name) => name.clone(),
        Expr::Member { object, property } => format!("{}.{}", describe(object), property),
        _ => "expression".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Property access
// ---------------------------------------------------------------------------

fn get_property(target: &RuntimeValue, property: &str) -> Result<RuntimeValue, RuntimeError> {
    match target {
        RuntimeValue::Object(object) => Ok(object.get(property).cloned().unwrap_or(RuntimeValue::Null)),
        RuntimeValue::Array(array) => {
            if property == "length" {
                return Ok(RuntimeValue::Number(array.items.len() as f64));
            }
            Ok(property
                .parse::<usize>()
                .ok()
                .and_then(|index| array.items.get(index).cloned())
                .unwrap_or(RuntimeValue::Null))
        }
        RuntimeValue::String(s) => {
            if property == "length" {
                return Ok(RuntimeValue::Number(s.chars().count() as f64));
            }
            Ok(property
                .parse::<usize>()
                .ok()
                .and_then(|index| s.chars().nth(index))
                .map(|c| RuntimeValue::String(c.to_string()))
                .unwrap_or(RuntimeValue::Null))
        }
        RuntimeValue::Null => Err(RuntimeError::InvalidProperty {
            property: property.to_string(),
            target: "null".to_string(),
        }),
        _ => Ok(RuntimeValue::Null),
    }
}

// ---------------------------------------------------------------------------
// Methods
// ---------------------------------------------------------------------------

fn call_method(
    target: &RuntimeValue,
    method: &str,
    arguments: &[RuntimeValue],
) -> Result<RuntimeValue, RuntimeError> {
    let unknown = || RuntimeError::UnknownMethod {
        method: method.to_string(),
        target: target.type_name().to_string(),
    };

    match target {
        RuntimeValue::Object(object) => match object.get(method) {
            Some(RuntimeValue::Function(func)) => func.call(arguments),
            None if method == "toString" => Ok(RuntimeValue::String(target.to_string())),
            _ => Err(RuntimeError::NotCallable(method.to_string())),
        },

        RuntimeValue::Null => Err(RuntimeError::InvalidProperty {
            property: method.to_string(),
            target: "null".to_string(),
        }),

        RuntimeValue::Number(n) => match method {
            "toFixed" => {
                let digits = match arguments.first() {
                    Some(value) => coerce_number(value)?.clamp(0.0, 100.0) as usize,
                    None => 0,
                };
                Ok(RuntimeValue::String(format!("{:.*}", digits, n)))
            }
            "toString" => Ok(RuntimeValue::String(target.to_string())),
            _ => Err(unknown()),
        },

        RuntimeValue::String(s) => match method {
            "toUpperCase" => Ok(RuntimeValue::String(s.to_uppercase())),
            "toLowerCase" => Ok(RuntimeValue::String(s.to_lowercase())),
            "trim" => Ok(RuntimeValue::String(s.trim().to_string())),
            "toString" => Ok(target.clone()),
            "includes" => {
                let needle = arguments.first().map(|a| a.to_string()).unwrap_or_default();
                Ok(RuntimeValue::Boolean(s.contains(&needle)))
            }
            "slice" => {
                let chars: Vec<char> = s.chars().collect();
                let range = slice_range(chars.len(), arguments)?;
                Ok(RuntimeValue::String(chars[range].iter().collect()))
            }
            "concat" => {
                let mut out = s.clone();
                for argument in arguments {
                    out.push_str(&argument.to_string());
                }
                Ok(RuntimeValue::String(out))
            }
            _ => Err(unknown()),
        },

        RuntimeValue::Array(array) => match method {
            "join" => {
                let separator = match arguments.first() {
                    Some(RuntimeValue::Null) | None => ",".to_string(),
                    Some(value) => value.to_string(),
                };
                let joined = array
                    .items
                    .iter()
                    .map(|item| match item {
                        RuntimeValue::Null => String::new(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(&separator);
                Ok(RuntimeValue::String(joined))
            }
            "includes" => {
                let needle = arguments.first().unwrap_or(&RuntimeValue::Null);
                Ok(RuntimeValue::Boolean(array.items.contains(needle)))
            }
            "slice" => {
                let range = slice_range(array.items.len(), arguments)?;
                Ok(RuntimeValue::Array(Array::new(
                    array.items[range].to_vec(),
                    array.unordered,
                )))
            }
            "concat" => {
                let mut items = array.items.clone();
                for argument in arguments {
                    match argument {
                        RuntimeValue::Array(other) => items.extend(other.items.iter().cloned()),
                        other => items.push(other.clone()),
                    }
                }
                Ok(RuntimeValue::Array(Array::new(items, array.unordered)))
            }
            "toString" => Ok(RuntimeValue::String(target.to_string())),
            _ => Err(unknown()),
        },

        RuntimeValue::Boolean(_) | RuntimeValue::Function(_) => match method {
            "toString" => Ok(RuntimeValue::String(target.to_string())),
            _ => Err(unknown()),
        },
    }
}

/// `slice(start?, end?)` bounds: negative offsets count from the end and
/// everything is clamped to `0..=len`.
fn slice_range(len: usize, arguments: &[RuntimeValue]) -> Result<std::ops::Range<usize>, RuntimeError> {
    let resolve = |value: Option<&RuntimeValue>, default: usize| -> Result<usize, RuntimeError> {
        let Some(value) = value else { return Ok(default) };
        let n = coerce_number(value)?.trunc();
        let index = if n < 0.0 { len as f64 + n } else { n };
        Ok(index.clamp(0.0, len as f64) as usize)
    };
    let start = resolve(arguments.first(), 0)?;
    let end = resolve(arguments.get(1), len)?;
    Ok(start..end.max(start))
}

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

fn coerce_number(val: &RuntimeValue) -> Result<f64, RuntimeError> {
    match val {
        RuntimeValue::Number(n) => Ok(*n),
        other => Err(RuntimeError::TypeError {
            expected: "number".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

fn eval_binary_op(
    op: &BinaryOperator,
    left: &RuntimeValue,
    right: &RuntimeValue,
) -> Result<RuntimeValue, RuntimeError> {
    match op {
        BinaryOperator::Addition => match (left, right) {
            (RuntimeValue::Number(a), RuntimeValue::Number(b)) => {
                Ok(RuntimeValue::Number(a + b))
            }
            (RuntimeValue::String(_), _) | (_, RuntimeValue::String(_)) => {
                Ok(RuntimeValue::String(format!("{}{}", left, right)))
            }
            _ => Err(RuntimeError::TypeError {
                expected: "numbers or a string".to_string(),
                got: format!("{} + {}", left.type_name(), right.type_name()),
            }),
        },
        BinaryOperator::Subtraction => numeric_binop(left, right, |a, b| a - b),
        BinaryOperator::Multiplication => numeric_binop(left, right, |a, b| a * b),
        BinaryOperator::Division => {
            let a = coerce_number(left)?;
            let b = coerce_number(right)?;
            if b == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(RuntimeValue::Number(a / b))
        }
        BinaryOperator::Modulo => {
            let a = coerce_number(left)?;
            let b = coerce_number(right)?;
            if b == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(RuntimeValue::Number(a % b))
        }
        BinaryOperator::Equality => Ok(RuntimeValue::Boolean(loose_equals(left, right))),
        BinaryOperator::Inequality => Ok(RuntimeValue::Boolean(!loose_equals(left, right))),
        BinaryOperator::StrictEquality => Ok(RuntimeValue::Boolean(left == right)),
        BinaryOperator::StrictInequality => Ok(RuntimeValue::Boolean(left != right)),
        BinaryOperator::GreaterThan => compare(left, right, |a, b| a > b, |a, b| a > b),
        BinaryOperator::LessThan => compare(left, right, |a, b| a < b, |a, b| a < b),
        BinaryOperator::GreaterThanOrEqual => compare(left, right, |a, b| a >= b, |a, b| a >= b),
        BinaryOperator::LessThanOrEqual => compare(left, right, |a, b| a <= b, |a, b| a <= b),
        // Handled before the right operand is evaluated.
        BinaryOperator::LogicalAnd | BinaryOperator::LogicalOr => Ok(right.clone()),
    }
}

fn numeric_binop(
    left: &RuntimeValue,
    right: &RuntimeValue,
    f: impl Fn(f64, f64) -> f64,
) -> Result<RuntimeValue, RuntimeError> {
    let a = coerce_number(left)?;
    let b = coerce_number(right)?;
    Ok(RuntimeValue::Number(f(a, b)))
}

/// Strings compare lexicographically, everything else numerically.
fn compare(
    left: &RuntimeValue,
    right: &RuntimeValue,
    strings: impl Fn(&str, &str) -> bool,
    numbers: impl Fn(f64, f64) -> bool,
) -> Result<RuntimeValue, RuntimeError> {
    if let (RuntimeValue::String(a), RuntimeValue::String(b)) = (left, right) {
        return Ok(RuntimeValue::Boolean(strings(a, b)));
    }
    let a = coerce_number(left)?;
    let b = coerce_number(right)?;
    Ok(RuntimeValue::Boolean(numbers(a, b)))
}

/// `==`: values of different types are compared after numeric conversion of
/// strings and booleans. `null` only equals itself.
fn loose_equals(left: &RuntimeValue, right: &RuntimeValue) -> bool {
    if mem::discriminant(left) == mem::discriminant(right) {
        return left == right;
    }
    match (loose_number(left), loose_number(right)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn loose_number(value: &RuntimeValue) -> Option<f64> {
    match value {
        RuntimeValue::Number(n) => Some(*n),
        RuntimeValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        RuntimeValue::String(s) if s.trim().is_empty() => Some(0.0),
        RuntimeValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
