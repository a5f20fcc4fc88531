//! Locates `%%Name=Value%%` directive tokens.
//!
//! The name is an identifier, the value is any run of non-whitespace that
//! ends at the first closing `%%`.

use crate::region::Region;

const MARKER: &str = "%%";

/// A directive found in a buffer.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Token<'source> {
    /// The directive name, like `Master`.
    pub name: &'source str,
    /// The argument, like `Layout`.
    pub value: &'source str,
    /// Where the whole token sits, markers included.
    pub region: Region,
}

/// Return the first directive at or after `from` whose name satisfies
/// `accept`.
pub fn find<'source, F>(source: &'source str, from: usize, accept: F) -> Option<Token<'source>>
where
    F: Fn(&str) -> bool,
{
    Tokens::new(source, from).find(|token| accept(token.name))
}

/// An iterator over every directive in a buffer, in document order.
pub struct Tokens<'source> {
    source: &'source str,
    cursor: usize,
}

impl<'source> Tokens<'source> {
    /// Create a new [`Tokens`] that begins scanning at `from`.
    pub fn new(source: &'source str, from: usize) -> Self {
        Self {
            source,
            cursor: from.min(source.len()),
        }
    }
}

impl<'source> Iterator for Tokens<'source> {
    type Item = Token<'source>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(offset) = self.source.get(self.cursor..)?.find(MARKER) {
            let begin = self.cursor + offset;
            match lex_token(self.source, begin) {
                Some(token) => {
                    self.cursor = token.region.end;
                    return Some(token);
                }
                // A `%` is one byte, so this stays on a char boundary.
                None => self.cursor = begin + 1,
            }
        }
        self.cursor = self.source.len();

        None
    }
}

/// Read a directive that starts at `begin`, which must point at `%%`.
fn lex_token(source: &str, begin: usize) -> Option<Token<'_>> {
    let name_begin = begin + MARKER.len();
    let rest = &source[name_begin..];

    let mut chars = rest.char_indices();
    match chars.next() {
        Some((_, c)) if is_ident_start(c) => {}
        _ => return None,
    }
    let name_len = chars
        .find(|(_, c)| !is_ident_continue(*c))
        .map(|(n, _)| n)
        .unwrap_or(rest.len());

    let after_name = &rest[name_len..];
    if !after_name.starts_with('=') {
        return None;
    }

    let value_begin = name_begin + name_len + 1;
    let value_text = &source[value_begin..];
    let run = value_text
        .find(char::is_whitespace)
        .unwrap_or(value_text.len());
    let value_len = value_text[..run].find(MARKER)?;
    if value_len == 0 {
        return None;
    }

    let end = value_begin + value_len + MARKER.len();

    Some(Token {
        name: &source[name_begin..name_begin + name_len],
        value: &source[value_begin..value_begin + value_len],
        region: (begin..end).into(),
    })
}

/// Return true if the given character can begin a directive name, meaning
/// '_' or an `xid_start`.
fn is_ident_start(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_start(c)
}

/// Return true if the given character can continue a directive name.
fn is_ident_continue(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}
