use codespan_reporting::diagnostic::{Diagnostic, Label};
use thiserror::Error;

use crate::snippet;

/// A fatal syntax error. Parsing stops at the first one.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}\n{snippet}")]
pub struct ParseError {
    pub message: String,
    /// 1-based line of the offending region.
    pub line: usize,
    /// Number of lines in the offending region.
    pub size: usize,
    /// Rendered excerpt of the source around the region.
    pub snippet: String,
    pub notes: Vec<String>,
}

impl ParseError {
    pub fn new(source: &str, message: impl Into<String>, line: usize, size: usize) -> Self {
        ParseError {
            message: message.into(),
            line,
            size,
            snippet: snippet::extract(source, line, size),
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self, file_id: usize, source: &str) -> Diagnostic<usize> {
        let span = snippet::line_range(source, self.line, self.size);
        Diagnostic::error()
            .with_message(&self.message)
            .with_labels(vec![Label::primary(file_id, span)])
            .with_notes(self.notes.clone())
    }
}
