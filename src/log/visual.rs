mod pointer;

pub use pointer::Pointer;

use std::fmt::{Debug, Formatter, Result};

const BLANK: &str = "";
const PIPE: &str = "|";
const EQUAL: &str = "=";
const HIGHLIGHT: &str = "^";

/// Describes a type that can be attached to an [`Error`][`crate::Error`] to
/// illustrate where in a template the problem was found.
pub trait Visual: Debug + Send + Sync {
    /// Display the visualization by writing to the given Formatter.
    fn display(
        &self,
        formatter: &mut Formatter<'_>,
        template: Option<&str>,
        help: Option<&str>,
    ) -> Result;
}

/// Return the zero indexed line and display column of the byte `offset`
/// within `source`.
///
/// Offsets past the end of `source` resolve to the end of the last line.
fn get_line_and_column(source: &str, offset: usize) -> (usize, usize) {
    let offset = floor_boundary(source, offset.min(source.len()));
    let before = &source[..offset];
    let line = before.matches('\n').count();
    let start = before.rfind('\n').map(|n| n + 1).unwrap_or(0);

    (line, get_width(&before[start..]))
}

/// Move `offset` back until it lands on a char boundary.
fn floor_boundary(source: &str, mut offset: usize) -> usize {
    while offset > 0 && !source.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Wrapper for UnicodeWidthStr::width.
fn get_width(s: &str) -> usize {
    unicode_width::UnicodeWidthStr::width(s)
}
