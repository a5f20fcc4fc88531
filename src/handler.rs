//! Transforms that rewrite a view buffer during compilation and rendering.
//!
//! A handler is either a [`Directive`], invoked once per `%%Name=Value%%`
//! token it answers to, or a [`Substitution`], invoked once on the whole
//! buffer. Every handler is registered for one [`Phase`]:
//!
//! | Handler | Phase | Trigger |
//! |---|---|---|
//! | [`MasterPage`] | Compile | `%%Master=Layout%%` |
//! | [`CommentSubstitution`] | Compile | `@@ ... @@` |
//! | [`HeadSubstitution`] | Compile | `[[ ... ]]`, `%%Head%%` |
//! | [`PlaceHolder`] | AfterCompile | `%%Placeholder=Name%%` |
//! | [`PartialPage`] | AfterCompile | `%%Partial=View%%` |
//! | [`HelperBundle`] | Render | `%%HelperBundles%%` |
//! | [`AntiForgeryToken`] | Render | `%%AntiForgeryToken%%` |
//! | [`Bundle`] | Render | `%%Include=path%%`, `%%Bundle=name%%` |
//!
//! Within a phase, substitutions run in registration order. Directives also
//! run in registration order, and after every rewrite the buffer is scanned
//! again from the start, so a directive introduced by a rewrite (like one in a
//! merged master page) is processed in the same phase.
//!
//! Custom handlers are added after the standard set:
//!
//! ```
//! use vellum::handler::{Handlers, Pass, Phase, Substitution};
//! use vellum::Error;
//!
//! struct Shout;
//!
//! impl Substitution for Shout {
//!     fn apply(&self, buffer: String, _: &mut Pass<'_>) -> Result<String, Error> {
//!         Ok(buffer.to_uppercase())
//!     }
//! }
//!
//! let handlers = Handlers::new().with_substitution(Phase::Render, Shout);
//! assert_eq!(handlers.len(), 1);
//! ```

mod antiforgery;
mod bundle;
mod comment;
mod head;
mod helper;
mod master;
mod partial;
mod placeholder;

pub use antiforgery::AntiForgeryToken;
pub use bundle::{Assets, Bundle};
pub use comment::CommentSubstitution;
pub use head::HeadSubstitution;
pub use helper::HelperBundle;
pub use master::MasterPage;
pub use partial::PartialPage;
pub use placeholder::PlaceHolder;

use crate::{
    compile::scan::{self, Token},
    hook::Hooks,
    log::Error,
    template::{CompiledViewSet, TemplateSet},
};
use std::collections::{BTreeSet, HashMap};

/// When a handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Before substitutions, while the view is compiled.
    Compile,
    /// After the compile-phase substitutions.
    AfterCompile,
    /// Every time the view is rendered.
    Render,
}

/// A handler that rewrites one `%%Name=Value%%` token at a time.
pub trait Directive: Send + Sync {
    /// Directive names this handler answers to.
    fn names(&self) -> &[&'static str];

    /// Rewrite `buffer` for the given `token`.
    ///
    /// Returns the rewritten buffer, or `None` to leave the token in place.
    /// A returned buffer must no longer contain `token` at the same spot, or
    /// the phase will not terminate.
    fn apply(
        &self,
        token: &Token<'_>,
        buffer: &str,
        pass: &mut Pass<'_>,
    ) -> Result<Option<String>, Error>;
}

/// A handler that rewrites a whole buffer, without an explicit token.
pub trait Substitution: Send + Sync {
    /// Rewrite `buffer`.
    fn apply(&self, buffer: String, pass: &mut Pass<'_>) -> Result<String, Error>;
}

/// One of the two handler shapes.
pub enum Handler {
    Directive(Box<dyn Directive>),
    Substitution(Box<dyn Substitution>),
}

/// State shared by the handlers during one compile or render of one view.
pub struct Pass<'a> {
    /// Full name of the view being processed.
    pub view: &'a str,
    /// Raw templates, keyed by full name.
    pub templates: &'a TemplateSet,
    /// Views compiled so far, keyed by full name.
    pub compiled: &'a CompiledViewSet,
    /// Views this view was found to depend on.
    dependencies: BTreeSet<String>,
    /// Master pages merged so far, in merge order.
    merged: Vec<String>,
    /// Expansions memoized for the rest of the pass.
    memo: HashMap<String, String>,
}

impl<'a> Pass<'a> {
    /// Create a new [`Pass`] over `view`.
    pub fn new(view: &'a str, templates: &'a TemplateSet, compiled: &'a CompiledViewSet) -> Self {
        Self {
            view,
            templates,
            compiled,
            dependencies: BTreeSet::new(),
            merged: vec![],
            memo: HashMap::new(),
        }
    }

    /// Record that the view depends on `full_name`.
    pub fn depend_on(&mut self, full_name: &str) {
        self.dependencies.insert(full_name.to_string());
    }

    /// Return the dependencies recorded so far.
    #[inline]
    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    /// Consume the [`Pass`] and return its recorded dependencies.
    #[inline]
    pub fn into_dependencies(self) -> BTreeSet<String> {
        self.dependencies
    }

    /// Record a master page merge.
    ///
    /// Returns false if `full_name` is the view itself or was merged before.
    pub fn merge(&mut self, full_name: &str) -> bool {
        if full_name == self.view || self.merged.iter().any(|m| m == full_name) {
            return false;
        }
        self.merged.push(full_name.to_string());
        true
    }

    /// Return a memoized expansion.
    #[inline]
    pub fn recall(&self, key: &str) -> Option<&str> {
        self.memo.get(key).map(String::as_str)
    }

    /// Memoize an expansion for the rest of the pass.
    #[inline]
    pub fn remember(&mut self, key: impl Into<String>, expansion: impl Into<String>) {
        self.memo.insert(key.into(), expansion.into());
    }
}

/// An ordered set of handlers, each registered for a [`Phase`].
#[derive(Default)]
pub struct Handlers {
    entries: Vec<(Phase, Handler)>,
}

impl Handlers {
    /// Create a new, empty [`Handlers`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the standard handler set.
    ///
    /// `assets` resolves `%%Include%%`, `%%Bundle%%` and helper assets, and
    /// `hooks` supplies the anti-forgery token minter and helper registry.
    pub fn standard(assets: &Assets, hooks: &Hooks) -> Self {
        Self::new()
            .with_directive(Phase::Compile, MasterPage)
            .with_substitution(Phase::Compile, CommentSubstitution)
            .with_substitution(Phase::Compile, HeadSubstitution)
            .with_directive(Phase::AfterCompile, PlaceHolder)
            .with_directive(Phase::AfterCompile, PartialPage)
            .with_substitution(
                Phase::Render,
                HelperBundle::new(assets.clone(), hooks.helpers.clone()),
            )
            .with_substitution(Phase::Render, AntiForgeryToken::new(hooks.tokens.clone()))
            .with_directive(Phase::Render, Bundle::new(assets.clone()))
    }

    /// Register a [`Handler`] for `phase`, after every handler already
    /// registered.
    #[inline]
    pub fn add(&mut self, phase: Phase, handler: Handler) {
        self.entries.push((phase, handler));
    }

    /// Register a [`Directive`].
    ///
    /// Returns the [`Handlers`], so additional methods may be chained.
    #[inline]
    pub fn with_directive(mut self, phase: Phase, directive: impl Directive + 'static) -> Self {
        self.add(phase, Handler::Directive(Box::new(directive)));
        self
    }

    /// Register a [`Substitution`].
    ///
    /// Returns the [`Handlers`], so additional methods may be chained.
    #[inline]
    pub fn with_substitution(
        mut self,
        phase: Phase,
        substitution: impl Substitution + 'static,
    ) -> Self {
        self.add(phase, Handler::Substitution(Box::new(substitution)));
        self
    }

    /// Return the number of registered handlers.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return true if no handler is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the directives registered for `phase`, in registration order.
    pub fn directives(&self, phase: Phase) -> impl Iterator<Item = &dyn Directive> {
        self.entries.iter().filter_map(move |(p, handler)| match handler {
            Handler::Directive(d) if *p == phase => Some(d.as_ref()),
            _ => None,
        })
    }

    /// Return the substitutions registered for `phase`, in registration order.
    pub fn substitutions(&self, phase: Phase) -> impl Iterator<Item = &dyn Substitution> {
        self.entries.iter().filter_map(move |(p, handler)| match handler {
            Handler::Substitution(s) if *p == phase => Some(s.as_ref()),
            _ => None,
        })
    }

    /// Fold `buffer` through every directive registered for `phase`.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error`] a directive returns.
    pub fn run_directives(
        &self,
        phase: Phase,
        buffer: String,
        pass: &mut Pass<'_>,
    ) -> Result<String, Error> {
        self.directives(phase)
            .try_fold(buffer, |buffer, directive| apply_directive(directive, buffer, pass))
    }

    /// Fold `buffer` through every substitution registered for `phase`.
    ///
    /// # Errors
    ///
    /// Returns the first [`Error`] a substitution returns.
    pub fn run_substitutions(
        &self,
        phase: Phase,
        buffer: String,
        pass: &mut Pass<'_>,
    ) -> Result<String, Error> {
        self.substitutions(phase)
            .try_fold(buffer, |buffer, substitution| substitution.apply(buffer, pass))
    }
}

/// Apply `directive` to each of its tokens until none remain that it is
/// willing to rewrite.
fn apply_directive(
    directive: &dyn Directive,
    mut buffer: String,
    pass: &mut Pass<'_>,
) -> Result<String, Error> {
    let names = directive.names();
    let mut from = 0;

    while let Some(token) = scan::find(&buffer, from, |name| names.iter().any(|n| *n == name)) {
        match directive.apply(&token, &buffer, pass)? {
            Some(rewritten) => {
                buffer = rewritten;
                from = 0;
            }
            None => from = token.region.end,
        }
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replaces `%%Echo=x%%` with `x`.
    struct Echo;

    impl Directive for Echo {
        fn names(&self) -> &[&'static str] {
            &["Echo"]
        }

        fn apply(
            &self,
            token: &Token<'_>,
            buffer: &str,
            _: &mut Pass<'_>,
        ) -> Result<Option<String>, Error> {
            if token.value == "keep" {
                return Ok(None);
            }
            Ok(Some(token.region.splice(buffer, token.value)))
        }
    }

    /// Wraps the buffer in brackets.
    struct Wrap;

    impl Substitution for Wrap {
        fn apply(&self, buffer: String, _: &mut Pass<'_>) -> Result<String, Error> {
            Ok(format!("[{buffer}]"))
        }
    }

    #[test]
    fn test_directive_rescans() {
        let templates = TemplateSet::new();
        let compiled = CompiledViewSet::new();
        let mut pass = Pass::new("Views/Home", &templates, &compiled);
        let handlers = Handlers::new().with_directive(Phase::Compile, Echo);

        let result = handlers
            .run_directives(
                Phase::Compile,
                "a %%Echo=keep%% %%Echo=b%% %%Other=c%%".into(),
                &mut pass,
            )
            .unwrap();

        assert_eq!(result, "a %%Echo=keep%% b %%Other=c%%");
    }

    #[test]
    fn test_phase_filter() {
        let templates = TemplateSet::new();
        let compiled = CompiledViewSet::new();
        let mut pass = Pass::new("Views/Home", &templates, &compiled);
        let handlers = Handlers::new()
            .with_substitution(Phase::Compile, Wrap)
            .with_substitution(Phase::Render, Wrap)
            .with_substitution(Phase::Render, Wrap);

        let result = handlers
            .run_substitutions(Phase::Render, "x".into(), &mut pass)
            .unwrap();

        assert_eq!(result, "[[x]]");
        assert_eq!(handlers.directives(Phase::Render).count(), 0);
    }

    #[test]
    fn test_merge_guard() {
        let templates = TemplateSet::new();
        let compiled = CompiledViewSet::new();
        let mut pass = Pass::new("Views/Home", &templates, &compiled);

        assert!(pass.merge("Views/Shared/Layout"));
        assert!(!pass.merge("Views/Shared/Layout"));
        assert!(!pass.merge("Views/Home"));
    }
}
