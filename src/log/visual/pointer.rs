use std::{
    cmp::max,
    fmt::{Formatter, Result},
};

use super::{
    super::{RESET, YELLOW},
    {floor_boundary, get_line_and_column, get_width, Visual, BLANK, EQUAL, HIGHLIGHT, PIPE},
};
use crate::region::Region;

/// A type of `Visual` that underlines a region of template source, usually
/// the directive token a handler could not satisfy.
#[derive(Debug, PartialEq)]
pub struct Pointer {
    /// Zero indexed line being pointed to.
    line: usize,
    /// Zero indexed display column being pointed to.
    column: usize,
    /// Display width of the highlighted text.
    length: usize,
    /// The line of text that is being pointed to.
    text: String,
}

impl Pointer {
    /// Create a new Pointer over the given source text and Region.
    pub fn new(source: &str, region: Region) -> Self {
        let (line, column) = get_line_and_column(source, region.begin);
        let text = source
            .lines()
            .nth(line)
            .or_else(|| source.lines().last())
            .unwrap_or_default()
            .to_string();

        let begin = floor_boundary(source, region.begin.min(source.len()));
        let end = floor_boundary(source, region.end.min(source.len())).max(begin);
        // Only the part of the region on the first line is underlined.
        let highlighted = source[begin..end].lines().next().unwrap_or_default();
        let length = max(1, get_width(highlighted));

        Self {
            line,
            column,
            length,
            text,
        }
    }
}

impl Visual for Pointer {
    fn display(
        &self,
        formatter: &mut Formatter<'_>,
        template: Option<&str>,
        help: Option<&str>,
    ) -> Result {
        let num = (self.line + 1).to_string();
        let col = self.column + 1;
        let pad = get_width(&num);
        let align = self.column + self.length;

        let name = template.unwrap_or("?");
        let text = &self.text;
        let underline = HIGHLIGHT.repeat(self.length);

        write!(
            formatter,
            "\n {BLANK:pad$}--> {name}:{num}:{col}\
             \n {BLANK:pad$} {PIPE}\
             \n {num:>} {PIPE} {text}\
             \n {BLANK:pad$} {PIPE} {YELLOW}{underline:>align$}{RESET}\
             \n {BLANK:pad$} {PIPE}\n",
        )?;

        if let Some(help) = help {
            writeln!(formatter, "{BLANK:pad$} {EQUAL} help: {help}")?;
        }

        Ok(())
    }
}
