mod value;

pub use value::{Compiled, Key, Value, ValueKind};

/// A header-delimited region of a document.
/// The root section is the level 1 header on the first line.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Header title, trimmed. Empty when the header has no title.
    pub name: String,
    /// Header level: 1 = root (#), 2 = (##), and so on.
    pub level: usize,
    /// 1-based line of the header.
    pub line: usize,
    /// The original header line.
    pub content: String,
    pub children: Vec<Node>,
}

impl Section {
    /// All value blocks in document order, descending into child sections.
    pub fn values(&self) -> Vec<&Value> {
        let mut values = Vec::new();
        collect_values(self, &mut values);
        values
    }

    /// Direct child sections.
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.children.iter().filter_map(|child| match child {
            Node::Section(section) => Some(section),
            _ => None,
        })
    }

    /// Find a descendant section (or this one) by name.
    pub fn find_section(&self, name: &str) -> Option<&Section> {
        if self.name == name {
            return Some(self);
        }
        self.sections().find_map(|section| section.find_section(name))
    }
}

fn collect_values<'a>(section: &'a Section, out: &mut Vec<&'a Value>) {
    for child in &section.children {
        match child {
            Node::Section(section) => collect_values(section, out),
            Node::Value(value) => out.push(value),
            Node::Text(_) | Node::Code(_) => {}
        }
    }
}

/// A child of a section.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Section(Section),
    Text(Text),
    Code(Code),
    Value(Value),
}

impl Node {
    /// 1-based start line in the original source.
    pub fn line(&self) -> usize {
        match self {
            Node::Section(section) => section.line,
            Node::Text(text) => text.line,
            Node::Code(code) => code.line,
            Node::Value(value) => value.line,
        }
    }
}

/// A run of consecutive non-indented, non-header lines.
#[derive(Debug, Clone, PartialEq)]
pub struct Text {
    pub content: String,
    pub line: usize,
    pub size: usize,
}

/// A fenced code block. `line`/`size` cover both fences.
#[derive(Debug, Clone, PartialEq)]
pub struct Code {
    /// Text following the opening fence marker.
    pub language: String,
    /// Lines strictly between the fences.
    pub content: String,
    pub line: usize,
    pub size: usize,
}
