//! Strict re-serialization of rendered markup.

use crate::log::{error_malformed_output, Error};
use quick_xml::{
    events::{BytesText, Event},
    Reader, Writer,
};

/// Re-serialize `markup` as well-formed XML, indented by two spaces.
///
/// Whitespace-only text between elements is dropped, unless it touches text
/// or an entity reference. Everything else is written back in document order
/// with its content untouched.
///
/// # Errors
///
/// Returns an [`Error`] of kind
/// [`ErrorKind::MalformedOutput`][`crate::ErrorKind::MalformedOutput`] when an
/// element is unclosed or closed out of order, or the markup cannot be read.
pub fn normalize(markup: &str) -> Result<String, Error> {
    let mut reader = Reader::from_str(markup);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    let mut depth = 0usize;
    // Whitespace waiting to learn whether it sits next to text.
    let mut pending = None;
    let mut after_text = false;

    loop {
        let event = match reader.read_event().map_err(error_malformed_output)? {
            // A reference stays inline with the text around it.
            Event::GeneralRef(reference) => Event::Text(BytesText::from_escaped(format!(
                "&{};",
                String::from_utf8_lossy(&reference)
            ))),
            event => event,
        };

        let is_text = matches!(event, Event::Text(_));
        if matches!(&event, Event::Text(text) if text.iter().all(u8::is_ascii_whitespace)) {
            pending = Some(event);
            continue;
        }
        match &event {
            Event::Start(_) => depth += 1,
            Event::End(e) => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    error_malformed_output(format!(
                        "unexpected closing tag `{}`",
                        String::from_utf8_lossy(e.name().as_ref())
                    ))
                })?;
            }
            Event::Eof => break,
            _ => {}
        }

        if let Some(space) = pending.take() {
            if after_text || is_text {
                writer.write_event(space).map_err(error_malformed_output)?;
            }
        }
        writer.write_event(event).map_err(error_malformed_output)?;
        after_text = is_text;
    }

    if depth > 0 {
        return Err(error_malformed_output(format!(
            "{depth} element(s) are not closed"
        )));
    }

    String::from_utf8(writer.into_inner()).map_err(error_malformed_output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_indents() {
        assert_eq!(
            normalize("<div>   <p>hi</p>\n\n</div>").unwrap(),
            "<div>\n  <p>hi</p>\n</div>"
        );
    }

    #[test]
    fn test_keeps_inline_whitespace() {
        assert_eq!(
            normalize("<p>Hello <b>x</b> world</p>").unwrap(),
            "<p>Hello <b>x</b> world</p>"
        );
    }

    #[test]
    fn test_keeps_entities() {
        assert_eq!(
            normalize("<main><h1>Fish &amp; Chips</h1></main>").unwrap(),
            "<main>\n  <h1>Fish &amp; Chips</h1>\n</main>"
        );
        assert_eq!(normalize("<p>&lt;tag&gt;</p>").unwrap(), "<p>&lt;tag&gt;</p>");
        assert_eq!(
            normalize("<p><b>a</b> &amp; <i>b</i></p>").unwrap(),
            "<p>\n  <b>a</b> &amp; <i>b</i>\n</p>"
        );
    }

    #[test]
    fn test_keeps_preformatted_text() {
        assert_eq!(
            normalize("<div><pre>  a\n    b  </pre><textarea>  keep  </textarea></div>").unwrap(),
            "<div>\n  <pre>  a\n    b  </pre>\n  <textarea>  keep  </textarea>\n</div>"
        );
    }

    #[test]
    fn test_keeps_empty_elements() {
        let result = normalize(r#"<form><input type="hidden" name="a" value="b" /></form>"#);

        assert!(result.is_ok_and(|r| r.contains(r#"<input type="hidden" name="a" value="b"/>"#)
            || r.contains(r#"<input type="hidden" name="a" value="b" />"#)));
    }

    #[test]
    fn test_unclosed() {
        let result = normalize("<div><p>hi</div>");

        assert!(result.is_err_and(|e| e.kind() == ErrorKind::MalformedOutput));
    }

    #[test]
    fn test_unterminated() {
        assert!(normalize("<html><body>").is_err());
    }
}
