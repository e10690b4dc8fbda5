//! Source excerpts for error messages.

use std::ops::Range;

const CONTEXT_LINES: usize = 2;

/// Render lines `line - 2 ..= line + size + 1` of `source` (clamped to the
/// document). Lines inside `line .. line + size` are marked with `>>`.
///
/// ```text
///  3    | ## Users
///  4 >> | 	user without
///  5    | 	name: 1
/// ```
pub fn extract(source: &str, line: usize, size: usize) -> String {
    let lines: Vec<&str> = split_lines(source).collect();
    let line = line.max(1);
    let size = size.max(1);
    let first = line.saturating_sub(CONTEXT_LINES).max(1);
    let last = (line + size - 1 + CONTEXT_LINES).min(lines.len());

    (first..=last)
        .map(|number| {
            let marker = if number >= line && number < line + size {
                ">>"
            } else {
                "  "
            };
            format!(" {} {} | {}", number, marker, lines[number - 1])
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Byte range covering lines `line .. line + size`, excluding the final line
/// break. Used to label diagnostics.
pub fn line_range(source: &str, line: usize, size: usize) -> Range<usize> {
    let mut start = source.len();
    let mut end = source.len();
    let mut offset = 0;
    let last = line + size.max(1) - 1;

    for (index, text) in source.split('\n').enumerate() {
        let number = index + 1;
        if number == line {
            start = offset;
        }
        if number == last {
            end = offset + text.strip_suffix('\r').unwrap_or(text).len();
            break;
        }
        offset += text.len() + 1;
    }

    start.min(end)..end
}

fn split_lines(source: &str) -> impl Iterator<Item = &str> {
    source.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l))
}
