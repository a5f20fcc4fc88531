//! Fills `{{key}}`, `{|key|}` and `{!key!}` tag placeholders.

mod escape;

pub use escape::{escape_html, markdown};

use crate::tags::Tags;
use morel::{Finder, Syntax};

/// Placeholder markers, as registered with the [`Finder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    BeginRaw = 0,
    EndRaw = 1,
    BeginEscaped = 2,
    EndEscaped = 3,
    BeginMarkdown = 4,
    EndMarkdown = 5,
}

impl Marker {
    fn from_id(id: usize) -> Option<Self> {
        match id {
            0 => Some(Self::BeginRaw),
            1 => Some(Self::EndRaw),
            2 => Some(Self::BeginEscaped),
            3 => Some(Self::EndEscaped),
            4 => Some(Self::BeginMarkdown),
            5 => Some(Self::EndMarkdown),
            _ => None,
        }
    }

    /// Return the marker that closes this one, if this one opens a placeholder.
    fn closer(self) -> Option<Self> {
        match self {
            Self::BeginRaw => Some(Self::EndRaw),
            Self::BeginEscaped => Some(Self::EndEscaped),
            Self::BeginMarkdown => Some(Self::EndMarkdown),
            _ => None,
        }
    }
}

/// Return a [`Syntax`] holding every placeholder marker.
fn syntax() -> Syntax {
    Syntax::new(vec![
        (Marker::BeginRaw as usize, "{{".into()),
        (Marker::EndRaw as usize, "}}".into()),
        (Marker::BeginEscaped as usize, "{|".into()),
        (Marker::EndEscaped as usize, "|}".into()),
        (Marker::BeginMarkdown as usize, "{!".into()),
        (Marker::EndMarkdown as usize, "!}".into()),
    ])
}

/// Replace every tag placeholder in `text` with its value from `tags`.
///
/// `{{key}}` inserts the value as is, `{|key|}` HTML-escapes it and `{!key!}`
/// renders it as markdown. A placeholder whose key is missing or empty is
/// deleted. The text is scanned once, so a value that itself looks like a
/// placeholder is left alone.
///
/// # Examples
///
/// ```
/// use vellum::{render::substitute, Tags};
///
/// let tags = Tags::new().with("name", "<Ann>");
/// assert_eq!(substitute("{{name}} {|name|} {{other}}!", &tags), "<Ann> &lt;Ann&gt; !");
/// ```
pub fn substitute(text: &str, tags: &Tags) -> String {
    let finder = Finder::new(syntax());
    let mut buffer = String::with_capacity(text.len());
    let mut cursor = 0;

    while cursor < text.len() {
        let Some((id, begin, end)) = finder.next(text, cursor) else {
            break;
        };
        match placeholder(&finder, text, id, end) {
            Some((marker, key, after)) => {
                buffer.push_str(&text[cursor..begin]);
                if let Some(value) = tags.get(key).filter(|v| !v.is_empty()) {
                    match marker {
                        Marker::BeginEscaped => buffer.push_str(&escape_html(value)),
                        Marker::BeginMarkdown => buffer.push_str(markdown(value).trim_end()),
                        _ => buffer.push_str(value),
                    }
                }
                cursor = after;
            }
            None => {
                // Markers are ascii, so one byte past `begin` is a boundary.
                buffer.push_str(&text[cursor..begin + 1]);
                cursor = begin + 1;
            }
        }
    }
    buffer.push_str(&text[cursor..]);

    buffer
}

/// Read the key and closing marker of a placeholder whose opening marker
/// ends at `from`.
///
/// Returns the opening marker, the key and where the placeholder ends.
fn placeholder<'source>(
    finder: &Finder,
    text: &'source str,
    id: usize,
    from: usize,
) -> Option<(Marker, &'source str, usize)> {
    let marker = Marker::from_id(id)?;
    let closer = marker.closer()?;

    let key_len = text[from..]
        .find(|c: char| !is_key(c))
        .unwrap_or(text.len() - from);
    if key_len == 0 {
        return None;
    }

    let key_end = from + key_len;
    if key_end == text.len() {
        return None;
    }

    match finder.starts(text, key_end) {
        Some((close, end)) if Marker::from_id(close) == Some(closer) => {
            Some((marker, &text[from..key_end], end))
        }
        _ => None,
    }
}

/// Return true if `c` may appear in a placeholder key.
#[inline]
fn is_key(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_forms() {
        let tags = Tags::new().with("x", "<b>hi</b>");
        let result = substitute("{{x}} {|x|} {!x!}", &tags);

        assert_eq!(
            result,
            "<b>hi</b> &lt;b&gt;hi&lt;/b&gt; <p><b>hi</b></p>"
        );
    }

    #[test]
    fn test_markdown() {
        let tags = Tags::new().with("body", "**bold** and _em_");

        assert_eq!(
            substitute("<div>{!body!}</div>", &tags),
            "<div><p><strong>bold</strong> and <em>em</em></p></div>"
        );
    }

    #[test]
    fn test_missing_and_empty_are_deleted() {
        let tags = Tags::new().with("empty", "");

        assert_eq!(substitute("a{{missing}}b{|empty|}c{!none!}d", &tags), "abcd");
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let tags = Tags::new().with("a", "{{b}}").with("b", "nope");

        assert_eq!(substitute("{{a}}", &tags), "{{b}}");
    }

    #[test]
    fn test_malformed_placeholders_survive() {
        let tags = Tags::new().with("x", "1");

        assert_eq!(substitute("{{ x }} {{x|} {|x}} {{}}", &tags), "{{ x }} {{x|} {|x}} {{}}");
        assert_eq!(substitute("{{{x}}}", &tags), "{1}");
        assert_eq!(substitute("a-b_c {{x", &tags), "a-b_c {{x");
    }

    #[test]
    fn test_keys() {
        let tags = Tags::new().with("user_2", "ok");

        assert_eq!(substitute("{{user_2}}", &tags), "ok");
        assert_eq!(substitute("{{user-2}}", &tags), "{{user-2}}");
    }
}
