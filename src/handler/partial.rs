use super::{Directive, Pass};
use crate::{
    compile::scan::Token,
    log::{Error, MISSING_PARTIAL},
    template,
};

/// Inlines the compiled text of the view named by `%%Partial=Name%%`.
///
/// Unlike [`MasterPage`][`super::MasterPage`], no dependency is recorded.
#[derive(Debug, Default, Clone, Copy)]
pub struct PartialPage;

impl Directive for PartialPage {
    fn names(&self) -> &[&'static str] {
        &["Partial"]
    }

    fn apply(
        &self,
        token: &Token<'_>,
        buffer: &str,
        pass: &mut Pass<'_>,
    ) -> Result<Option<String>, Error> {
        let partial = template::resolve(pass.compiled, token.value).ok_or_else(|| {
            Error::build(MISSING_PARTIAL)
                .with_pointer(buffer, token.region)
                .with_name(pass.view)
                .with_help(format!("no compiled view named `{}`", token.value))
        })?;

        Ok(Some(token.region.splice(buffer, &partial.compiled)))
    }
}
