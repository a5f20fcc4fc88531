use pulldown_cmark::{html, Options, Parser};

/// Return `text` with the HTML special characters replaced by entities.
pub fn escape_html(text: &str) -> String {
    let mut buffer = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => buffer.push_str("&amp;"),
            '<' => buffer.push_str("&lt;"),
            '>' => buffer.push_str("&gt;"),
            '"' => buffer.push_str("&quot;"),
            '\'' => buffer.push_str("&#39;"),
            c => buffer.push(c),
        }
    }

    buffer
}

/// Render `text` as markdown to HTML.
pub fn markdown(text: &str) -> String {
    let parser = Parser::new_ext(text, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);
    let mut buffer = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut buffer, parser);

    buffer
}
