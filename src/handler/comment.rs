use super::{Pass, Substitution};
use crate::log::Error;
use regex::Regex;
use std::sync::LazyLock;

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)@@.*?@@").expect("comment pattern is valid"));

/// Deletes every `@@ ... @@` comment block.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommentSubstitution;

impl Substitution for CommentSubstitution {
    fn apply(&self, buffer: String, _: &mut Pass<'_>) -> Result<String, Error> {
        Ok(COMMENT.replace_all(&buffer, "").into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{CompiledViewSet, TemplateSet};

    fn strip(text: &str) -> String {
        let templates = TemplateSet::new();
        let compiled = CompiledViewSet::new();
        let mut pass = Pass::new("Views/Home", &templates, &compiled);

        CommentSubstitution.apply(text.into(), &mut pass).unwrap()
    }

    #[test]
    fn test_strip() {
        assert_eq!(strip("a @@ secret @@b"), "a b");
    }

    #[test]
    fn test_multi_line_non_greedy() {
        assert_eq!(strip("a@@ one\ntwo @@b@@three@@c"), "abc");
    }

    #[test]
    fn test_unterminated_is_kept() {
        assert_eq!(strip("100@@ off"), "100@@ off");
    }
}
