pub mod scan;

mod graph;

pub use graph::DependencyGraph;

use crate::{
    cache::Snapshot,
    handler::{Handlers, Pass, Phase},
    log::{error_missing_view, Error},
    render,
    tags::Tags,
    template::{self, CompiledView, CompiledViewSet, Template, TemplateSet},
};
use std::fmt;
use tracing::{debug, warn};

/// Compiles templates into [`CompiledView`] instances and renders them.
///
/// Owns the raw templates, the compiled views and the [`DependencyGraph`]
/// recording which views were built from which master pages.
pub struct ViewCompiler {
    templates: TemplateSet,
    compiled: CompiledViewSet,
    graph: DependencyGraph,
    handlers: Handlers,
}

impl ViewCompiler {
    /// Create a new [`ViewCompiler`] over `templates`, with nothing compiled.
    ///
    /// When two templates share a full name, the later one wins.
    pub fn new<I>(templates: I, handlers: Handlers) -> Self
    where
        I: IntoIterator<Item = Template>,
    {
        let mut compiler = Self {
            templates: TemplateSet::new(),
            compiled: CompiledViewSet::new(),
            graph: DependencyGraph::new(),
            handlers,
        };
        for template in templates {
            compiler.insert_template(template);
        }

        compiler
    }

    /// Create a [`ViewCompiler`] holding the state of `snapshot`.
    pub fn restore(snapshot: Snapshot, handlers: Handlers) -> Self {
        let mut compiler = Self::new(snapshot.raw_templates, handlers);
        compiler.graph = snapshot.dependencies;
        compiler.compiled = snapshot
            .compiled_views
            .into_iter()
            .map(|view| (view.full_name.clone(), view))
            .collect();

        compiler
    }

    /// Return a [`Snapshot`] of the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            raw_templates: self.templates.values().cloned().collect(),
            compiled_views: self.compiled.values().cloned().collect(),
            dependencies: self.graph.clone(),
        }
    }

    /// Return the raw templates, keyed by full name.
    #[inline]
    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// Return the compiled views, keyed by full name.
    #[inline]
    pub fn compiled_views(&self) -> &CompiledViewSet {
        &self.compiled
    }

    /// Return the [`DependencyGraph`].
    #[inline]
    pub fn dependencies(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Return the raw template called `name`.
    pub fn template(&self, name: &str) -> Option<&Template> {
        template::resolve(&self.templates, name)
    }

    /// Return the compiled view called `name`.
    pub fn compiled_view(&self, name: &str) -> Option<&CompiledView> {
        template::resolve(&self.compiled, name)
    }

    /// Insert a raw template, returning the one it replaces.
    ///
    /// The compiled view is left alone until the template is compiled again.
    pub fn insert_template(&mut self, template: Template) -> Option<Template> {
        let previous = self
            .templates
            .insert(template.full_name.clone(), template);
        if let Some(previous) = &previous {
            debug!(view = %previous.full_name, "replaced template");
        }

        previous
    }

    /// Compile the view called `name`, replacing any earlier compiled view
    /// with the same full name.
    ///
    /// Fragments are compiled to their raw text. Other views run the
    /// compile-phase directives, then the compile-phase substitutions, then
    /// the after-compile directives, and finally lose their blank lines.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of kind [`ErrorKind::NotFound`][`crate::ErrorKind`]
    /// when no template is called `name`, or the [`Error`] a handler returns.
    pub fn compile(&mut self, name: &str) -> Result<&CompiledView, Error> {
        let template = self
            .template(name)
            .ok_or_else(|| error_missing_view(name))?;
        let full_name = template.full_name.clone();

        let (text, dependencies) = if template.is_fragment() {
            (template.raw.clone(), Default::default())
        } else {
            let mut pass = Pass::new(&full_name, &self.templates, &self.compiled);
            let text = self.run(template.raw.clone(), &mut pass)?;

            (strip_blank_lines(&text), pass.into_dependencies())
        };

        let view = CompiledView::new(template, text);
        self.graph.set(&full_name, dependencies);
        self.compiled.insert(full_name.clone(), view);
        debug!(view = %full_name, "compiled view");

        Ok(&self.compiled[&full_name])
    }

    /// Compile every template, returning the number compiled.
    ///
    /// A view that fails is logged and skipped. Views are retried while a
    /// round compiles at least one, so a view including a partial that sorts
    /// after it still compiles.
    pub fn compile_all(&mut self) -> usize {
        let mut pending: Vec<String> = self.templates.keys().cloned().collect();
        let mut count = 0;

        loop {
            let attempted = pending.len();
            let mut failed = vec![];
            for name in pending {
                match self.compile(&name) {
                    Ok(_) => count += 1,
                    Err(e) => failed.push((name, e)),
                }
            }

            if failed.is_empty() || failed.len() == attempted {
                for (name, e) in &failed {
                    warn!(view = %name, "{e:#}");
                }
                break;
            }
            pending = failed.into_iter().map(|(name, _)| name).collect();
        }

        count
    }

    /// Render the view called `name` without storing the result.
    ///
    /// Runs the render-phase substitutions, then the render-phase directives,
    /// then fills tag placeholders when `tags` is given. Every call mints new
    /// anti-forgery tokens, so two renders of the same view can differ.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of kind [`ErrorKind::NotFound`][`crate::ErrorKind`]
    /// when the view is not compiled, or the [`Error`] a handler returns.
    pub fn evaluate(&self, name: &str, tags: Option<&Tags>) -> Result<String, Error> {
        let view = self
            .compiled_view(name)
            .ok_or_else(|| error_missing_view(name))?;

        let mut pass = Pass::new(&view.full_name, &self.templates, &self.compiled);
        let buffer = self
            .handlers
            .run_substitutions(Phase::Render, view.compiled.clone(), &mut pass)?;
        let buffer = self
            .handlers
            .run_directives(Phase::Render, buffer, &mut pass)?;

        Ok(match tags {
            Some(tags) => render::substitute(&buffer, tags),
            None => buffer,
        })
    }

    /// Store `rendered` as the latest render of the view called `name`.
    ///
    /// Returns false if no such view is compiled.
    pub fn remember(&mut self, name: &str, rendered: String) -> bool {
        let Some(full_name) = self.compiled_view(name).map(|v| v.full_name.clone()) else {
            return false;
        };
        if let Some(view) = self.compiled.get_mut(&full_name) {
            view.rendered = Some(rendered);
        }

        true
    }

    /// Render the view called `name` and store the result.
    ///
    /// # Errors
    ///
    /// Returns the [`Error`] that [`evaluate`][`Self::evaluate`] returns.
    pub fn render(&mut self, name: &str, tags: Option<&Tags>) -> Result<String, Error> {
        let rendered = self.evaluate(name, tags)?;
        self.remember(name, rendered.clone());

        Ok(rendered)
    }

    /// Recompile every view built from `name`, or `name` itself when no view
    /// depends on it.
    ///
    /// Returns the full names of the views that compiled. Failures are logged.
    pub fn recompile_dependencies(&mut self, name: &str) -> Vec<String> {
        let full_name = self
            .template(name)
            .map(|t| t.full_name.clone())
            .unwrap_or_else(|| name.to_string());

        let mut targets = self.graph.dependents(&full_name);
        if targets.is_empty() {
            targets.push(full_name);
        }

        targets
            .into_iter()
            .filter(|target| match self.compile(target) {
                Ok(_) => true,
                Err(e) => {
                    warn!(view = %target, "{e:#}");
                    false
                }
            })
            .collect()
    }

    /// Replace the raw template of a changed file and rebuild what it
    /// affects.
    ///
    /// Nothing is rebuilt when the content fingerprint matches the compiled
    /// view. Otherwise the dependents of the template are recompiled, and the
    /// template itself. Returns the full names of the views that compiled.
    pub fn update(&mut self, template: Template) -> Vec<String> {
        let full_name = template.full_name.clone();
        let unchanged = self
            .compiled
            .get(&full_name)
            .is_some_and(|view| view.hash == template.hash);
        self.insert_template(template);

        if unchanged {
            debug!(view = %full_name, "template unchanged");
            return vec![];
        }

        let mut rebuilt = self.recompile_dependencies(&full_name);
        if !rebuilt.contains(&full_name) {
            match self.compile(&full_name) {
                Ok(_) => rebuilt.push(full_name),
                Err(e) => warn!(view = %full_name, "{e:#}"),
            }
        }

        rebuilt
    }

    fn run(&self, buffer: String, pass: &mut Pass<'_>) -> Result<String, Error> {
        let buffer = self.handlers.run_directives(Phase::Compile, buffer, pass)?;
        let buffer = self.handlers.run_substitutions(Phase::Compile, buffer, pass)?;

        self.handlers.run_directives(Phase::AfterCompile, buffer, pass)
    }
}

impl fmt::Debug for ViewCompiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewCompiler")
            .field("templates", &self.templates.len())
            .field("compiled", &self.compiled.len())
            .field("graph", &self.graph)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

/// Remove every line that is empty or only whitespace.
pub fn strip_blank_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        handler::Assets,
        hook::{Concatenate, Hooks, OneTimeTokens},
        Config, ErrorKind,
    };
    use regex::Regex;
    use std::{path::Path, sync::Arc};

    fn template(path: &str, raw: &str) -> Template {
        let root = Path::new("/app/Views");
        Template::new(root, &root.join(format!("{path}.html")), raw.to_string())
    }

    fn compiler_with(hooks: &Hooks, entries: &[(&str, &str)]) -> ViewCompiler {
        let assets = Assets::new(&Config::default(), Arc::new(Concatenate));
        let handlers = Handlers::standard(&assets, hooks);

        ViewCompiler::new(entries.iter().map(|(p, r)| template(p, r)), handlers)
    }

    fn compiler(entries: &[(&str, &str)]) -> ViewCompiler {
        compiler_with(&Hooks::default(), entries)
    }

    #[test]
    fn test_round_trip() {
        let mut compiler = compiler(&[("Home", "<p>a</p>\n\n  \n<p>b</p>\n")]);
        compiler.compile("Views/Home").unwrap();

        assert_eq!(
            compiler.render("Views/Home", None).unwrap(),
            "<p>a</p>\n<p>b</p>"
        );
        assert_eq!(
            compiler.compiled_view("Home").unwrap().rendered.as_deref(),
            Some("<p>a</p>\n<p>b</p>")
        );
    }

    #[test]
    fn test_compile_is_idempotent() {
        let mut compiler = compiler(&[("Home", "x\n\ny")]);
        let first = compiler.compile("Home").unwrap().compiled.clone();
        let second = compiler.compile("Home").unwrap().compiled.clone();

        assert_eq!(first, second);
        assert_eq!(compiler.compiled_views().len(), 1);
    }

    #[test]
    fn test_master_merge() {
        let mut compiler = compiler(&[
            ("Shared/Layout", "HEADER %%View%% FOOTER"),
            ("Home", "%%Master=Layout%% BODY "),
        ]);
        let view = compiler.compile("Views/Home").unwrap();

        assert_eq!(view.compiled, "HEADER  BODY  FOOTER");
        assert_eq!(
            compiler.dependencies().dependents("Views/Shared/Layout"),
            vec!["Views/Home"]
        );
    }

    #[test]
    fn test_dependency_rebuild() {
        let mut compiler = compiler(&[
            ("Shared/Layout", "HEADER %%View%% FOOTER"),
            ("Home", "%%Master=Layout%% BODY "),
        ]);
        assert_eq!(compiler.compile_all(), 2);

        compiler.insert_template(template("Shared/Layout", "NEW %%View%% END"));
        let rebuilt = compiler.recompile_dependencies("Views/Shared/Layout");

        assert_eq!(rebuilt, vec!["Views/Home"]);
        assert_eq!(
            compiler.compiled_view("Views/Home").unwrap().compiled,
            "NEW  BODY  END"
        );
    }

    #[test]
    fn test_recompile_without_dependents() {
        let mut compiler = compiler(&[("Home", "old")]);
        compiler.compile_all();
        compiler.insert_template(template("Home", "new"));

        assert_eq!(compiler.recompile_dependencies("Home"), vec!["Views/Home"]);
        assert_eq!(compiler.compiled_view("Home").unwrap().compiled, "new");
    }

    #[test]
    fn test_update() {
        let mut compiler = compiler(&[
            ("Shared/Layout", "[%%View%%]"),
            ("Home", "%%Master=Layout%%home"),
        ]);
        compiler.compile_all();
        compiler.render("Home", None).unwrap();

        assert!(compiler.update(template("Home", "%%Master=Layout%%home")).is_empty());
        assert!(compiler.compiled_view("Home").unwrap().rendered.is_some());

        let rebuilt = compiler.update(template("Shared/Layout", "<%%View%%>"));
        assert_eq!(rebuilt, vec!["Views/Home", "Views/Shared/Layout"]);
        assert_eq!(compiler.compiled_view("Home").unwrap().compiled, "<home>");
        assert!(compiler.compiled_view("Home").unwrap().rendered.is_none());
    }

    #[test]
    fn test_tags() {
        let mut compiler = compiler(&[("Home", "{{x}} {|x|} {!x!} [{{missing}}]")]);
        compiler.compile_all();
        let tags = Tags::new().with("x", "<b>hi</b>");

        assert_eq!(
            compiler.render("Home", Some(&tags)).unwrap(),
            "<b>hi</b> &lt;b&gt;hi&lt;/b&gt; <p><b>hi</b></p> []"
        );
        assert_eq!(
            compiler.render("Home", None).unwrap(),
            "{{x}} {|x|} {!x!} [{{missing}}]"
        );
    }

    #[test]
    fn test_comments_are_stripped() {
        let mut compiler = compiler(&[
            ("Shared/Layout", "@@ layout note @@%%Head%%|%%View%%"),
            (
                "Home",
                "%%Master=Layout%%[[ <meta name=\"a\" />@@ secret @@]]BODY@@ more\nlines @@",
            ),
        ]);
        compiler.compile_all();
        let compiled = &compiler.compiled_view("Home").unwrap().compiled;

        assert_eq!(compiled, "<meta name=\"a\" />|BODY");
        let rendered = compiler.render("Home", Some(&Tags::new())).unwrap();
        assert!(!rendered.contains("@@") && !rendered.contains("secret"));
    }

    #[test]
    fn test_fragment_bypass() {
        let raw = "%%Master=Layout%% @@ kept @@\n\n[[ head ]]\n";
        let mut compiler = compiler(&[("Home/RowFragment", raw)]);
        compiler.compile_all();

        assert_eq!(compiler.compiled_view("RowFragment").unwrap().compiled, raw);
        assert!(compiler.dependencies().is_empty());
    }

    #[test]
    fn test_anti_forgery_tokens() {
        let tokens = OneTimeTokens::default();
        let hooks = Hooks::default().with_tokens(tokens.clone());
        let mut compiler = compiler_with(
            &hooks,
            &[("Form", "<form>%%AntiForgeryToken%%</form>\n<form>%%AntiForgeryToken%%</form>")],
        );
        compiler.compile_all();

        let first = compiler.render("Form", None).unwrap();
        let second = compiler.render("Form", None).unwrap();
        let values: Vec<String> = Regex::new(r#"value="([0-9a-f]+)""#)
            .unwrap()
            .captures_iter(&first)
            .map(|c| c[1].to_string())
            .collect();

        assert_eq!(values.len(), 2);
        assert_ne!(values[0], values[1]);
        assert!(values.iter().all(|v| tokens.is_valid(v)));
        assert_ne!(first, second);
        assert_eq!(tokens.outstanding(), 4);
    }

    #[test]
    fn test_partial_sorting_after_includer() {
        let mut compiler = compiler(&[
            ("Home", "<body>%%Partial=Shared/Nav%%</body>"),
            ("Shared/Nav", "<nav>%%Placeholder=Links%%</nav>\n[Links]<a/>[/Links]"),
        ]);

        assert_eq!(compiler.compile_all(), 2);
        assert_eq!(
            compiler.compiled_view("Home").unwrap().compiled,
            "<body><nav><a/></nav></body>"
        );
        assert!(compiler.dependencies().is_empty());
    }

    #[test]
    fn test_compile_all_skips_failures() {
        let mut compiler = compiler(&[
            ("Broken", "%%Master=Nope%%"),
            ("Shared/A", "%%Master=B%%a%%View%%"),
            ("Shared/B", "%%Master=A%%b%%View%%"),
            ("Fine", "fine"),
        ]);

        assert_eq!(compiler.compile_all(), 1);
        assert!(compiler.compiled_view("Fine").is_some());
        assert!(compiler.compiled_view("Broken").is_none());
    }

    #[test]
    fn test_missing_view() {
        let mut compiler = compiler(&[]);

        assert!(compiler.compile("Nope").is_err_and(|e| e.kind() == ErrorKind::NotFound));
        assert!(compiler
            .evaluate("Nope", None)
            .is_err_and(|e| e.kind() == ErrorKind::NotFound));
        assert!(!compiler.remember("Nope", String::new()));
    }

    #[test]
    fn test_restore() {
        let mut compiler = compiler(&[
            ("Shared/Layout", "<%%View%%>"),
            ("Home", "%%Master=Layout%%x"),
        ]);
        compiler.compile_all();

        let assets = Assets::new(&Config::default(), Arc::new(Concatenate));
        let handlers = Handlers::standard(&assets, &Hooks::default());
        let restored = ViewCompiler::restore(compiler.snapshot(), handlers);

        assert_eq!(restored.snapshot(), compiler.snapshot());
        assert_eq!(restored.evaluate("Home", None).unwrap(), "<x>");
    }

    #[test]
    fn test_strip_blank_lines() {
        assert_eq!(strip_blank_lines("a\n\n \t\nb\r\n\r\nc\n"), "a\nb\nc");
        assert_eq!(strip_blank_lines("\n\n"), "");
    }
}
