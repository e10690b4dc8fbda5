use once_cell::sync::Lazy;
use regex::Regex;

use crate::document::{Code, Node, Section, Text};
use crate::parser::error::ParseError;
use crate::parser::value::{SourceLine, ValueParser};

static HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#+)(?: (.*))?$").unwrap());

const FENCE: &str = "```";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse source text into the root section.
pub fn parse_section(source: &str) -> Result<Section, ParseError> {
    if source.is_empty() {
        return Err(ParseError::new(source, "empty document", 1, 1));
    }

    let lines = split_lines(source);
    let mut state = ParseState::new(source, &lines);
    state.process_lines()?;
    state.finalize()
}

/// Split on `\n`, dropping a trailing `\r` from each line.
pub(crate) fn split_lines(source: &str) -> Vec<&str> {
    source
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

// ---------------------------------------------------------------------------
// Parse state
// ---------------------------------------------------------------------------

struct ParseState<'a> {
    source: &'a str,
    lines: &'a [&'a str],
    /// Stack of open sections. Innermost = current scope.
    section_stack: Vec<SectionBuilder>,
    /// Set by blank lines: the next content line starts a new block.
    new_block: bool,
}

struct SectionBuilder {
    name: String,
    level: usize,
    line: usize,
    content: String,
    children: Vec<PendingNode>,
}

/// A child whose content has not been sliced out of the source yet.
enum PendingNode {
    Section(SectionBuilder),
    Leaf(Leaf),
}

struct Leaf {
    kind: LeafKind,
    line: usize,
    size: usize,
}

#[derive(PartialEq)]
enum LeafKind {
    Text,
    Value,
    Code { language: String },
}

impl<'a> ParseState<'a> {
    fn new(source: &'a str, lines: &'a [&'a str]) -> Self {
        ParseState {
            source,
            lines,
            section_stack: Vec::new(),
            new_block: true,
        }
    }

    fn error(&self, message: impl Into<String>, line: usize) -> ParseError {
        ParseError::new(self.source, message, line, 1)
    }

    fn process_lines(&mut self) -> Result<(), ParseError> {
        let first = self.lines[0];
        let root = match HEADER.captures(first) {
            Some(caps) if caps[1].len() == 1 => SectionBuilder {
                name: header_name(&caps),
                level: 1,
                line: 1,
                content: first.to_string(),
                children: Vec::new(),
            },
            _ => return Err(self.error("the document must start with a level 1 header", 1)),
        };
        self.section_stack.push(root);

        let mut index = 1;
        while index < self.lines.len() {
            let text = self.lines[index];
            let line = index + 1;

            if text.starts_with(FENCE) {
                index = self.take_code(index)?;
                continue;
            }

            if text.trim().is_empty() {
                self.new_block = true;
            } else if let Some(caps) = HEADER.captures(text) {
                self.take_header(caps[1].len(), header_name(&caps), text, line)?;
            } else if text.starts_with('\t') {
                self.append_line(LeafKind::Value, line);
            } else if !text.starts_with(char::is_whitespace) {
                self.append_line(LeafKind::Text, line);
            } else {
                return Err(self
                    .error("invalid line", line)
                    .with_note("tabs are the only legal indentation"));
            }

            index += 1;
        }

        Ok(())
    }

    /// Consume a fenced code block starting at `start`; returns the index of
    /// the line after the closing fence.
    fn take_code(&mut self, start: usize) -> Result<usize, ParseError> {
        let language = self.lines[start][FENCE.len()..].to_string();
        let Some(offset) = self.lines[start + 1..].iter().position(|l| *l == FENCE) else {
            return Err(self.error("unterminated code block", start + 1));
        };
        let end = start + 1 + offset;

        self.current().children.push(PendingNode::Leaf(Leaf {
            kind: LeafKind::Code { language },
            line: start + 1,
            size: end - start + 1,
        }));
        self.new_block = false;

        Ok(end + 1)
    }

    fn take_header(
        &mut self,
        level: usize,
        name: String,
        text: &str,
        line: usize,
    ) -> Result<(), ParseError> {
        let depth = self.section_stack.len();
        if level > depth + 1 {
            return Err(self.error(
                format!("unexpected header level {} on section level {}", level, depth),
                line,
            ));
        }
        if level == 1 {
            return Err(self.error(
                "there can be only one level 1 header, on the first line",
                line,
            ));
        }

        self.close_sections_to_level(level);
        self.section_stack.push(SectionBuilder {
            name,
            level,
            line,
            content: text.to_string(),
            children: Vec::new(),
        });
        self.new_block = true;

        Ok(())
    }

    /// Extend the previous block of the same kind, or start a new one.
    fn append_line(&mut self, kind: LeafKind, line: usize) {
        let new_block = self.new_block;
        let section = self.current();
        match section.children.last_mut() {
            Some(PendingNode::Leaf(leaf)) if !new_block && leaf.kind == kind => {
                leaf.size += 1;
            }
            _ => section.children.push(PendingNode::Leaf(Leaf { kind, line, size: 1 })),
        }
        self.new_block = false;
    }

    fn current(&mut self) -> &mut SectionBuilder {
        // The root is only popped by finalize.
        let last = self.section_stack.len() - 1;
        &mut self.section_stack[last]
    }

    /// Close sections until the stack holds `level - 1` of them.
    fn close_sections_to_level(&mut self, level: usize) {
        while self.section_stack.len() >= level {
            let Some(builder) = self.section_stack.pop() else { break };
            match self.section_stack.last_mut() {
                Some(parent) => parent.children.push(PendingNode::Section(builder)),
                None => {
                    self.section_stack.push(builder);
                    break;
                }
            }
        }
    }

    fn finalize(mut self) -> Result<Section, ParseError> {
        self.close_sections_to_level(2);
        let Some(root) = self.section_stack.pop() else {
            return Err(self.error("the document must start with a level 1 header", 1));
        };

        let values = ValueParser::new(self.source);
        self.build_section(root, &values)
    }

    // -----------------------------------------------------------------------
    // Second pass: slice leaf content out of the source lines
    // -----------------------------------------------------------------------

    fn build_section(
        &self,
        builder: SectionBuilder,
        values: &ValueParser<'_>,
    ) -> Result<Section, ParseError> {
        let children = builder
            .children
            .into_iter()
            .map(|child| match child {
                PendingNode::Section(section) => {
                    self.build_section(section, values).map(Node::Section)
                }
                PendingNode::Leaf(leaf) => self.build_leaf(leaf, values),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Section {
            name: builder.name,
            level: builder.level,
            line: builder.line,
            content: builder.content,
            children,
        })
    }

    fn build_leaf(&self, leaf: Leaf, values: &ValueParser<'_>) -> Result<Node, ParseError> {
        let Leaf { kind, line, size } = leaf;
        let block = &self.lines[line - 1..line - 1 + size];

        match kind {
            LeafKind::Text => Ok(Node::Text(Text {
                content: block.join("\n"),
                line,
                size,
            })),
            LeafKind::Code { language } => Ok(Node::Code(Code {
                language,
                content: block[1..block.len() - 1].join("\n"),
                line,
                size,
            })),
            LeafKind::Value => {
                let lines = block
                    .iter()
                    .enumerate()
                    .map(|(offset, text)| SourceLine {
                        number: line + offset,
                        text: text.strip_prefix('\t').unwrap_or(text),
                    })
                    .collect();
                let mut value = values.parse_value(lines, line)?;
                value.content = block.join("\n");
                Ok(Node::Value(value))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn header_name(caps: &regex::Captures<'_>) -> String {
    caps.get(2).map_or("", |m| m.as_str()).trim().to_string()
}
