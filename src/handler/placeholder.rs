use super::{Directive, Pass};
use crate::{compile::scan::Token, log::Error, region::Region};
use regex::{escape, Regex};

/// Moves the content of a `[Name] ... [/Name]` block to the
/// `%%Placeholder=Name%%` directive.
///
/// The wrapper is deleted from where it was written. When no block with the
/// name exists, the directive is left untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceHolder;

impl Directive for PlaceHolder {
    fn names(&self) -> &[&'static str] {
        &["Placeholder"]
    }

    fn apply(
        &self,
        token: &Token<'_>,
        buffer: &str,
        _: &mut Pass<'_>,
    ) -> Result<Option<String>, Error> {
        let name = escape(token.value);
        let pattern = Regex::new(&format!(r"(?s)\[{name}\](.*?)\[/{name}\]")).map_err(|e| {
            Error::build("invalid placeholder name")
                .with_pointer(buffer, token.region)
                .with_help(e.to_string())
        })?;

        let Some(captures) = pattern.captures(buffer) else {
            return Ok(None);
        };
        let (Some(block), Some(inner)) = (captures.get(0), captures.get(1)) else {
            return Ok(None);
        };
        let block = Region::new(block.range());
        let content = inner.as_str();

        // Splice the later region first so the earlier offsets stay valid.
        let rewritten = if block.begin >= token.region.end {
            token.region.splice(&block.splice(buffer, ""), content)
        } else if block.end <= token.region.begin {
            block.splice(&token.region.splice(buffer, content), "")
        } else {
            // The directive sits inside its own block.
            block.splice(buffer, content).replacen(&buffer[token.region], "", 1)
        };

        Ok(Some(rewritten))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        handler::{Handlers, Phase},
        template::{CompiledViewSet, TemplateSet},
    };

    fn apply(text: &str) -> String {
        let templates = TemplateSet::new();
        let compiled = CompiledViewSet::new();
        let mut pass = Pass::new("Views/Home", &templates, &compiled);

        Handlers::new()
            .with_directive(Phase::AfterCompile, PlaceHolder)
            .run_directives(Phase::AfterCompile, text.into(), &mut pass)
            .unwrap()
    }

    #[test]
    fn test_block_after_directive() {
        assert_eq!(
            apply("<nav>%%Placeholder=Menu%%</nav><p>[Menu]<a/>[/Menu]</p>"),
            "<nav><a/></nav><p></p>"
        );
    }

    #[test]
    fn test_block_before_directive() {
        assert_eq!(
            apply("[Scripts]\n<script/>\n[/Scripts]<body/>%%Placeholder=Scripts%%"),
            "<body/>\n<script/>\n"
        );
    }

    #[test]
    fn test_missing_block() {
        assert_eq!(
            apply("<nav>%%Placeholder=Menu%%</nav>"),
            "<nav>%%Placeholder=Menu%%</nav>"
        );
    }

    #[test]
    fn test_name_is_literal() {
        assert_eq!(apply("%%Placeholder=a.b%%[axb]x[/axb][a.b]y[/a.b]"), "y[axb]x[/axb]");
    }
}
