use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::{Key, Value, ValueKind};
use crate::parser::error::ParseError;

/// `name:` or `"escaped name":`, then the rest of the line.
static KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^([A-Za-z0-9_$]+\??|"(?:[^"\\]|\\.)*"):[ ]?(.*)$"#).unwrap()
});

/// Like `KEY`, but also accepts dotted paths such as `items.0.name:`.
static PATH_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^([A-Za-z0-9_$]+(?:\.[A-Za-z0-9_$]+)*\??|"(?:[^"\\]|\\.)*"):[ ]?(.*)$"#)
        .unwrap()
});

/// `base with ...` or `base without ...`
static MIXIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_$][A-Za-z0-9_$]*(?:\.[A-Za-z0-9_$]+)*)\s+(with|without)(?:\s+(.*))?$")
        .unwrap()
});

/// The `with ...` tail following `without a, b;`
static WITH_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*with(?:\s+(.*))?$").unwrap());

static PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_$]+(?:\.[A-Za-z0-9_$]+)*$").unwrap());

/// One physical line of a value block, with its leading tab(s) for the
/// current nesting level already removed.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SourceLine<'a> {
    pub number: usize,
    pub text: &'a str,
}

/// Recursive parser for the lines of a value block.
pub(crate) struct ValueParser<'s> {
    source: &'s str,
}

impl<'s> ValueParser<'s> {
    pub fn new(source: &'s str) -> Self {
        ValueParser { source }
    }

    fn error(&self, message: impl Into<String>, line: usize, size: usize) -> ParseError {
        ParseError::new(self.source, message, line, size)
    }

    /// Parse `lines` into a typed value. `origin` is the line reported when
    /// nothing but blanks and comments remain.
    pub fn parse_value(&self, lines: Vec<SourceLine<'_>>, origin: usize) -> Result<Value, ParseError> {
        let (line, size, lines) = clean_lines(lines, origin);
        let Some(first) = lines.first().copied() else {
            return Err(self.error("expected a value", line, size));
        };

        let kind = if array_marker(first.text).is_some() {
            self.parse_array(&lines)?
        } else if KEY.is_match(first.text) {
            ValueKind::Object {
                keys: self.parse_keys(&lines, &KEY)?,
            }
        } else if let Some(caps) = MIXIN.captures(first.text) {
            let base = caps[1].to_string();
            let clause = caps[2].to_string();
            let rest = caps.get(3).map_or("", |m| m.as_str());
            self.parse_mixin(&lines, base, &clause, rest)?
        } else if lines.len() == 1 {
            ValueKind::Expression {
                code: first.text.trim().to_string(),
            }
        } else {
            return Err(self.error("invalid value syntax", line, size));
        };

        Ok(Value {
            line,
            size,
            content: lines.iter().map(|l| l.text).collect::<Vec<_>>().join("\n"),
            kind,
        })
    }

    // -----------------------------------------------------------------------
    // Arrays
    // -----------------------------------------------------------------------

    fn parse_array(&self, lines: &[SourceLine<'_>]) -> Result<ValueKind, ParseError> {
        let mut unordered = None;
        let mut elements: Vec<(usize, Vec<SourceLine<'_>>)> = Vec::new();

        for line in lines {
            if let Some((is_unordered, rest)) = array_marker(line.text) {
                match unordered {
                    Some(previous) if previous != is_unordered => {
                        return Err(self.error(
                            "cannot mix ordered (*) and unordered (@) markers in one array",
                            line.number,
                            1,
                        ));
                    }
                    _ => unordered = Some(is_unordered),
                }
                elements.push((line.number, vec![SourceLine { number: line.number, text: rest }]));
            } else if let (Some(text), Some((_, element))) =
                (line.text.strip_prefix('\t'), elements.last_mut())
            {
                element.push(SourceLine { number: line.number, text });
            } else {
                return Err(self.error(
                    "expected an element marker (* or @) followed by a tab",
                    line.number,
                    1,
                ));
            }
        }

        let elements = elements
            .into_iter()
            .map(|(origin, lines)| self.parse_value(lines, origin))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ValueKind::Array {
            elements,
            unordered: unordered.unwrap_or(false),
        })
    }

    // -----------------------------------------------------------------------
    // Objects
    // -----------------------------------------------------------------------

    /// Parse `key: value` entries. Each key line opens an entry; following
    /// tab-indented lines belong to it.
    fn parse_keys(&self, lines: &[SourceLine<'_>], pattern: &Regex) -> Result<Vec<Key>, ParseError> {
        let mut entries: Vec<(String, usize, Vec<SourceLine<'_>>)> = Vec::new();

        for line in lines {
            if let Some(caps) = pattern.captures(line.text) {
                let name = key_name(&caps[1]);
                let rest = caps.get(2).map_or("", |m| m.as_str());
                entries.push((name, line.number, vec![SourceLine { number: line.number, text: rest }]));
            } else if let (Some(text), Some((_, _, entry))) =
                (line.text.strip_prefix('\t'), entries.last_mut())
            {
                entry.push(SourceLine { number: line.number, text });
            } else {
                return Err(self.error("expected a key followed by ':'", line.number, 1));
            }
        }

        entries
            .into_iter()
            .map(|(name, origin, lines)| {
                Ok(Key {
                    name,
                    value: self.parse_value(lines, origin)?,
                })
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Mixins
    // -----------------------------------------------------------------------

    fn parse_mixin(
        &self,
        lines: &[SourceLine<'_>],
        base: String,
        clause: &str,
        rest: &str,
    ) -> Result<ValueKind, ParseError> {
        let first = lines[0];

        let (removals, with_rest) = if clause == "without" {
            let (list, tail) = match rest.split_once(';') {
                Some((list, tail)) => (list, Some(tail)),
                None => (rest, None),
            };
            let removals = self.parse_removals(list, first.number)?;
            let with_rest = match tail {
                None => None,
                Some(tail) => match WITH_TAIL.captures(tail) {
                    Some(caps) => Some(caps.get(1).map_or("", |m| m.as_str())),
                    None => {
                        return Err(self.error("expected 'with' after ';'", first.number, 1));
                    }
                },
            };
            (removals, with_rest)
        } else {
            (Vec::new(), Some(rest))
        };

        let additions = match with_rest {
            Some(rest) => self.parse_additions(lines, rest)?,
            None => {
                if let Some(extra) = lines.get(1) {
                    let last = lines[lines.len() - 1].number;
                    return Err(self.error(
                        "unexpected lines after a 'without' clause",
                        extra.number,
                        last - extra.number + 1,
                    ));
                }
                Vec::new()
            }
        };

        Ok(ValueKind::Mixin {
            base,
            removals,
            additions,
        })
    }

    fn parse_removals(&self, list: &str, line: usize) -> Result<Vec<String>, ParseError> {
        if list.trim().is_empty() {
            return Err(self.error("expected at least one path after 'without'", line, 1));
        }

        let mut removals: Vec<String> = Vec::new();
        for path in list.split(',').map(str::trim) {
            if !PATH.is_match(path) {
                return Err(self.error(format!("invalid path '{}'", path), line, 1));
            }
            if !removals.iter().any(|p| p == path) {
                removals.push(path.to_string());
            }
        }
        Ok(removals)
    }

    /// The `with` clause: the rest of the first line plus the continuation
    /// lines, read as path-keyed object entries.
    fn parse_additions(&self, lines: &[SourceLine<'_>], rest: &str) -> Result<Vec<Key>, ParseError> {
        let first = lines[0];
        let mut object = vec![SourceLine { number: first.number, text: rest }];

        for line in &lines[1..] {
            match line.text.strip_prefix('\t') {
                Some(text) => object.push(SourceLine { number: line.number, text }),
                None => {
                    return Err(self.error(
                        "expected the lines of a 'with' clause to be indented",
                        line.number,
                        1,
                    ));
                }
            }
        }

        let (line, size, object) = clean_lines(object, first.number);
        match object.first() {
            Some(head) if PATH_KEY.is_match(head.text) => self.parse_keys(&object, &PATH_KEY),
            Some(head) => Err(self.error("expected 'path: value' after 'with'", head.number, 1)),
            None => Err(self.error("expected at least one addition after 'with'", line, size)),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Drop comment lines, then a leading blank line. Returns the adjusted
/// start line and size alongside the remaining lines.
fn clean_lines(lines: Vec<SourceLine<'_>>, origin: usize) -> (usize, usize, Vec<SourceLine<'_>>) {
    let skip = match lines.first() {
        Some(first) if first.text.trim().is_empty() => 1,
        _ => 0,
    };
    let line = lines.get(skip).map_or(origin, |l| l.number);
    let size = lines.last().map_or(1, |last| (last.number + 1).saturating_sub(line).max(1));

    let lines = lines
        .into_iter()
        .skip(skip)
        .filter(|l| !is_comment(l.text))
        .collect::<Vec<_>>();

    (line, size, lines)
}

fn is_comment(text: &str) -> bool {
    text.trim_start().starts_with("//")
}

/// `*\t` (ordered) or `@\t` (unordered): returns the kind and the rest.
fn array_marker(text: &str) -> Option<(bool, &str)> {
    if let Some(rest) = text.strip_prefix("*\t") {
        Some((false, rest))
    } else {
        text.strip_prefix("@\t").map(|rest| (true, rest))
    }
}

/// Unquote a quoted key; bare keys are returned as written.
fn key_name(raw: &str) -> String {
    let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) else {
        return raw.to_string();
    };

    let mut name = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            name.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => name.push('\n'),
            Some('t') => name.push('\t'),
            Some('r') => name.push('\r'),
            Some(other) => name.push(other),
            None => {}
        }
    }
    name
}
