use super::{Pass, Substitution};
use crate::{hook::TokenMinter, log::Error};
use std::sync::Arc;

/// Marks where an anti-forgery token is placed.
pub const ANTI_FORGERY_TOKEN: &str = "%%AntiForgeryToken%%";

/// Name of the form field carrying the token.
pub const FIELD: &str = "AntiForgeryToken";

/// Replaces every `%%AntiForgeryToken%%` with a hidden form field holding a
/// freshly minted one-time token.
///
/// Every occurrence receives its own token, so rendering is not idempotent.
#[derive(Clone)]
pub struct AntiForgeryToken {
    tokens: Arc<dyn TokenMinter>,
}

impl AntiForgeryToken {
    /// Create a new [`AntiForgeryToken`] minting from `tokens`.
    pub fn new(tokens: Arc<dyn TokenMinter>) -> Self {
        Self { tokens }
    }
}

impl Substitution for AntiForgeryToken {
    fn apply(&self, mut buffer: String, _: &mut Pass<'_>) -> Result<String, Error> {
        let found: Vec<usize> = buffer
            .match_indices(ANTI_FORGERY_TOKEN)
            .map(|(n, _)| n)
            .collect();

        // Last to first, so replacing one does not shift the offsets before it.
        for begin in found.into_iter().rev() {
            let token = self.tokens.mint();
            let field = format!(r#"<input type="hidden" name="{FIELD}" value="{token}" />"#);
            buffer.replace_range(begin..begin + ANTI_FORGERY_TOKEN.len(), &field);
        }

        Ok(buffer)
    }
}

impl std::fmt::Debug for AntiForgeryToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AntiForgeryToken").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        hook::OneTimeTokens,
        template::{CompiledViewSet, TemplateSet},
    };
    use regex::Regex;

    #[test]
    fn test_each_occurrence_is_unique() {
        let tokens = OneTimeTokens::default();
        let handler = AntiForgeryToken::new(Arc::new(tokens.clone()));
        let templates = TemplateSet::new();
        let compiled = CompiledViewSet::new();
        let mut pass = Pass::new("Views/Home", &templates, &compiled);

        let result = handler
            .apply(
                "<form>%%AntiForgeryToken%%</form><form>%%AntiForgeryToken%%</form>".into(),
                &mut pass,
            )
            .unwrap();

        let values: Vec<String> = Regex::new(r#"value="([^"]+)""#)
            .unwrap()
            .captures_iter(&result)
            .map(|c| c[1].to_string())
            .collect();

        assert!(!result.contains(ANTI_FORGERY_TOKEN));
        assert_eq!(values.len(), 2);
        assert_ne!(values[0], values[1]);
        assert!(values.iter().all(|v| tokens.is_valid(v)));
    }

    #[test]
    fn test_without_marker() {
        let handler = AntiForgeryToken::new(Arc::new(|| -> String { unreachable!() }));
        let templates = TemplateSet::new();
        let compiled = CompiledViewSet::new();
        let mut pass = Pass::new("Views/Home", &templates, &compiled);

        assert_eq!(handler.apply("<p/>".into(), &mut pass).unwrap(), "<p/>");
    }
}
