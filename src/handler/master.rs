use super::{Directive, Pass};
use crate::{
    compile::scan::Token,
    log::{Error, CIRCULAR_MASTER, MISSING_MASTER},
    template,
};
use tracing::debug;

/// Marks where a master page receives the view merged into it.
pub const VIEW: &str = "%%View%%";

/// Folder master pages are looked up in.
const SHARED: &str = "Shared";

/// Merges a view into the master page named by `%%Master=Name%%`.
///
/// The master is looked up as `Shared/Name` among the raw templates. The view,
/// with the directive removed, replaces the master's first `%%View%%`, and the
/// master's text becomes the buffer. The merged master is recorded as a
/// dependency of the view.
#[derive(Debug, Default, Clone, Copy)]
pub struct MasterPage;

impl Directive for MasterPage {
    fn names(&self) -> &[&'static str] {
        &["Master"]
    }

    fn apply(
        &self,
        token: &Token<'_>,
        buffer: &str,
        pass: &mut Pass<'_>,
    ) -> Result<Option<String>, Error> {
        let wanted = format!("{SHARED}/{}", token.value);
        let master = template::resolve(pass.templates, &wanted).ok_or_else(|| {
            Error::build(MISSING_MASTER)
                .with_pointer(buffer, token.region)
                .with_name(pass.view)
                .with_help(format!("no view named `{wanted}` was loaded"))
        })?;

        if !pass.merge(&master.full_name) {
            return Err(Error::build(CIRCULAR_MASTER)
                .with_pointer(buffer, token.region)
                .with_name(pass.view)
                .with_help(format!(
                    "`{}` is already part of this view",
                    master.full_name
                )));
        }
        pass.depend_on(&master.full_name);

        if !master.raw.contains(VIEW) {
            debug!(master = %master.full_name, view = pass.view, "master has no view marker");
        }
        let child = token.region.splice(buffer, "");

        Ok(Some(master.raw.replacen(VIEW, &child, 1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        handler::Phase,
        template::{CompiledViewSet, Template, TemplateSet},
        ErrorKind, Handlers,
    };
    use std::path::Path;

    fn templates(entries: &[(&str, &str)]) -> TemplateSet {
        entries
            .iter()
            .map(|(path, raw)| {
                let path = Path::new("/app/Views").join(format!("{path}.html"));
                let template = Template::new(Path::new("/app/Views"), &path, raw.to_string());
                (template.full_name.clone(), template)
            })
            .collect()
    }

    fn run(templates: &TemplateSet, view: &str) -> (Result<String, Error>, Vec<String>) {
        let compiled = CompiledViewSet::new();
        let mut pass = Pass::new(view, templates, &compiled);
        let handlers = Handlers::new().with_directive(Phase::Compile, MasterPage);
        let raw = templates[view].raw.clone();
        let result = handlers.run_directives(Phase::Compile, raw, &mut pass);

        (result, pass.into_dependencies().into_iter().collect())
    }

    #[test]
    fn test_merge() {
        let templates = templates(&[
            ("Shared/Layout", "HEADER %%View%% FOOTER"),
            ("Home", "%%Master=Layout%% BODY "),
        ]);
        let (result, dependencies) = run(&templates, "Views/Home");

        assert_eq!(result.unwrap(), "HEADER  BODY  FOOTER");
        assert_eq!(dependencies, vec!["Views/Shared/Layout"]);
    }

    #[test]
    fn test_nested_masters() {
        let templates = templates(&[
            ("Shared/Base", "<html>%%View%%</html>"),
            ("Shared/Layout", "%%Master=Base%%<body>%%View%%</body>"),
            ("Home", "%%Master=Layout%%hi"),
        ]);
        let (result, dependencies) = run(&templates, "Views/Home");

        assert_eq!(result.unwrap(), "<html><body>hi</body></html>");
        assert_eq!(dependencies, vec!["Views/Shared/Base", "Views/Shared/Layout"]);
    }

    #[test]
    fn test_missing_master() {
        let templates = templates(&[("Home", "%%Master=Nope%% BODY")]);
        let (result, _) = run(&templates, "Views/Home");
        let error = result.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Handler);
        assert_eq!(error.reason(), MISSING_MASTER);
        assert_eq!(error.get_name(), Some("Views/Home"));
    }

    #[test]
    fn test_circular_master() {
        let templates = templates(&[
            ("Shared/A", "%%Master=B%%a%%View%%"),
            ("Shared/B", "%%Master=A%%b%%View%%"),
            ("Home", "%%Master=A%%home"),
        ]);
        let (result, _) = run(&templates, "Views/Home");

        assert!(result.is_err_and(|e| e.reason() == CIRCULAR_MASTER));
    }
}
