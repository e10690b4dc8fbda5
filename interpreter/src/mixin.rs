//! The mixin engine: derive a value from a base by removing and adding
//! dotted paths.

use std::fmt;

use mixdown::{Context, MixinError, Object, RuntimeError, RuntimeValue};
use tracing::trace;

/// One step of a dotted path. All-digit segments index arrays.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Index(usize),
    Key(String),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Index(index) => write!(f, "{}", index),
            Segment::Key(key) => write!(f, "{}", key),
        }
    }
}

/// A parsed dotted path such as `items.0.name`.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    pub fn parse(path: &str) -> Path {
        let segments = path
            .split('.')
            .map(|part| {
                if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(index) = part.parse() {
                        return Segment::Index(index);
                    }
                }
                Segment::Key(part.to_string())
            })
            .collect();
        Path { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Deep-copy `base`, then apply every removal followed by every addition.
/// `base` itself is never modified.
pub fn apply_mixin(
    base: &RuntimeValue,
    removals: &[Path],
    additions: &[(Path, RuntimeValue)],
) -> Result<RuntimeValue, MixinError> {
    if !base.is_structured() {
        return Err(MixinError::InvalidBase {
            got: base.type_name().to_string(),
        });
    }

    let mut result = base.clone();
    for path in removals {
        trace!(path = %path, "mixin removal");
        remove(&mut result, path.segments())?;
    }
    for (path, value) in additions {
        trace!(path = %path, "mixin addition");
        add(&mut result, path.segments(), value)?;
    }
    Ok(result)
}

/// Look up a dotted mixin base in `context`. The first segment names a
/// binding; the rest walk object keys and array indices.
pub fn resolve_base<'c>(context: &'c Context, base: &str) -> Result<&'c RuntimeValue, RuntimeError> {
    let mut parts = base.split('.');
    let first = parts.next().unwrap_or_default();
    let mut current = context
        .get(first)
        .ok_or_else(|| RuntimeError::UndefinedVariable(first.to_string()))?;

    for part in parts {
        let next = match current {
            RuntimeValue::Object(object) => object.get(part),
            RuntimeValue::Array(array) => part.parse::<usize>().ok().and_then(|i| array.items.get(i)),
            _ => None,
        };
        current = next.ok_or_else(|| MixinError::UnresolvedBase {
            base: base.to_string(),
            segment: part.to_string(),
        })?;
    }

    Ok(current)
}

// ---------------------------------------------------------------------------
// Path traversal
// ---------------------------------------------------------------------------

fn remove(target: &mut RuntimeValue, path: &[Segment]) -> Result<(), MixinError> {
    let Some((segment, rest)) = path.split_first() else {
        return Err(MixinError::EmptyPath);
    };

    match target {
        RuntimeValue::Array(array) => match segment {
            // Broadcast over every element.
            Segment::Key(_) => array.items.iter_mut().try_for_each(|item| remove(item, path)),
            Segment::Index(index) => {
                let len = array.items.len();
                if *index >= len {
                    return Err(MixinError::RemoveIndexOutOfRange { index: *index, len });
                }
                if rest.is_empty() {
                    array.items.remove(*index);
                    Ok(())
                } else {
                    remove(&mut array.items[*index], rest)
                }
            }
        },
        RuntimeValue::Object(object) => match segment {
            Segment::Index(index) => Err(MixinError::RemoveNumericKey { index: *index }),
            Segment::Key(key) => {
                let missing = || MixinError::MissingKey { key: key.clone() };
                if rest.is_empty() {
                    object.remove(key).map(|_| ()).ok_or_else(missing)
                } else {
                    let child = object.get_mut(key).ok_or_else(missing)?;
                    remove(child, rest)
                }
            }
        },
        _ => Err(MixinError::RemoveFromNonObject {
            key: segment.to_string(),
        }),
    }
}

fn add(target: &mut RuntimeValue, path: &[Segment], value: &RuntimeValue) -> Result<(), MixinError> {
    let Some((segment, rest)) = path.split_first() else {
        return Err(MixinError::EmptyPath);
    };

    match target {
        RuntimeValue::Array(array) => match segment {
            // Broadcast over every element.
            Segment::Key(_) => array
                .items
                .iter_mut()
                .try_for_each(|item| add(item, path, value)),
            Segment::Index(index) => {
                let len = array.items.len();
                if *index > len {
                    return Err(MixinError::AddIndexOutOfRange { index: *index, len });
                }
                match (rest.first(), *index == len) {
                    (None, true) => {
                        array.items.push(value.clone());
                        Ok(())
                    }
                    (None, false) => {
                        array.items[*index] = value.clone();
                        Ok(())
                    }
                    // One past the end holds nothing to descend into.
                    (Some(next), true) => Err(MixinError::AddToNonObject {
                        key: next.to_string(),
                    }),
                    (Some(_), false) => add(&mut array.items[*index], rest, value),
                }
            }
        },
        RuntimeValue::Object(object) => match segment {
            Segment::Index(index) => Err(MixinError::AddNumericKey { index: *index }),
            Segment::Key(key) => {
                if rest.is_empty() {
                    object.insert(key.clone(), value.clone());
                    return Ok(());
                }
                if !object.contains_key(key) {
                    object.insert(key.clone(), RuntimeValue::Object(Object::new()));
                }
                match object.get_mut(key) {
                    Some(child) => add(child, rest, value),
                    None => Err(MixinError::AddToNonObject { key: key.clone() }),
                }
            }
        },
        _ => Err(MixinError::AddToNonObject {
            key: segment.to_string(),
        }),
    }
}
