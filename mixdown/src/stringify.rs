//! Turn a document tree back into source text.

use crate::document::{Node, Section};

/// Serialize `section` and its descendants. For a tree parsed from `source`
/// with no blank-line runs or trailing whitespace, `stringify(&tree) == source`.
/// Compiled values keep their original text, so the same holds after
/// compilation.
pub fn stringify(section: &Section) -> String {
    let mut writer = Writer::default();
    writer.section(section);
    let Writer { mut out, trailing } = writer;
    out.truncate(out.len() - trailing);
    out
}

#[derive(Default)]
struct Writer {
    out: String,
    /// Newlines written after the last node.
    trailing: usize,
}

impl Writer {
    fn section(&mut self, section: &Section) {
        self.line(&section.content, 1);
        for child in &section.children {
            match child {
                Node::Section(section) => self.section(section),
                Node::Text(text) => self.line(&text.content, 2),
                Node::Value(value) => self.line(&value.content, 2),
                Node::Code(code) => {
                    self.out.push_str("```");
                    self.out.push_str(&code.language);
                    self.out.push('\n');
                    if code.size > 2 {
                        self.out.push_str(&code.content);
                        self.out.push('\n');
                    }
                    self.line("```", 2);
                }
            }
        }
    }

    fn line(&mut self, content: &str, newlines: usize) {
        self.out.push_str(content);
        self.out.extend(std::iter::repeat_n('\n', newlines));
        self.trailing = newlines;
    }
}
