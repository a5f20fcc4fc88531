//! Collaborators a host supplies to a [`ViewEngine`][`crate::ViewEngine`].
//!
//! Each collaborator is a trait with a blanket implementation for matching
//! closures, so a host can pass either a type or a function:
//!
//! ```
//! use vellum::hook::{Hooks, TokenMinter};
//!
//! let hooks = Hooks::default().with_tokens(|| "not-very-secret".to_string());
//! assert_eq!(hooks.tokens.mint(), "not-very-secret");
//! ```

use crate::log::{error_io, Error};
use parking_lot::{Mutex, RwLock};
use std::{collections::HashSet, fmt, fs, path::PathBuf, sync::Arc};
use uuid::Uuid;

/// Mints one-time tokens for `%%AntiForgeryToken%%`.
pub trait TokenMinter: Send + Sync {
    /// Return a fresh token. Every call must return a distinct value.
    fn mint(&self) -> String;
}

impl<F> TokenMinter for F
where
    F: Fn() -> String + Send + Sync,
{
    fn mint(&self) -> String {
        self()
    }
}

/// Produces the minified text of a bundle from its source files.
pub trait Minifier: Send + Sync {
    /// Minify the files at `paths`, which belong to the bundle `name`.
    fn minify(&self, name: &str, paths: &[PathBuf]) -> Result<String, Error>;
}

impl<F> Minifier for F
where
    F: Fn(&str, &[PathBuf]) -> Result<String, Error> + Send + Sync,
{
    fn minify(&self, name: &str, paths: &[PathBuf]) -> Result<String, Error> {
        self(name, paths)
    }
}

/// A [`Minifier`] that joins the files with newlines and does nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct Concatenate;

impl Minifier for Concatenate {
    fn minify(&self, _: &str, paths: &[PathBuf]) -> Result<String, Error> {
        let parts = paths
            .iter()
            .map(|path| fs::read_to_string(path).map_err(|e| error_io(path, e)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(parts.join("\n"))
    }
}

/// A registry of tokens that are each valid exactly once.
///
/// Cloning shares the registry, so a host can keep one clone to validate
/// submitted tokens while the engine mints with another.
///
/// ```
/// use vellum::hook::{OneTimeTokens, TokenMinter};
///
/// let tokens = OneTimeTokens::default();
/// let token = tokens.mint();
///
/// assert!(tokens.consume(&token));
/// assert!(!tokens.consume(&token));
/// ```
#[derive(Debug, Default, Clone)]
pub struct OneTimeTokens {
    issued: Arc<Mutex<HashSet<String>>>,
}

impl OneTimeTokens {
    /// Return true if `token` was issued and not consumed yet.
    pub fn is_valid(&self, token: &str) -> bool {
        self.issued.lock().contains(token)
    }

    /// Consume `token`, returning true if it was valid.
    pub fn consume(&self, token: &str) -> bool {
        self.issued.lock().remove(token)
    }

    /// Return the number of tokens issued and not consumed.
    pub fn outstanding(&self) -> usize {
        self.issued.lock().len()
    }
}

impl TokenMinter for OneTimeTokens {
    fn mint(&self) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.issued.lock().insert(token.clone());
        token
    }
}

/// Asset names registered by UI helper code, emitted by `%%HelperBundles%%`.
///
/// Cloning shares the registry.
#[derive(Debug, Default, Clone)]
pub struct HelperBundles {
    names: Arc<RwLock<Vec<String>>>,
}

impl HelperBundles {
    /// Register an asset name. Registering the same name twice has no effect.
    pub fn register(&self, name: impl Into<String>) {
        let name = name.into();
        let mut names = self.names.write();
        if !names.contains(&name) {
            names.push(name);
        }
    }

    /// Return the registered names, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.names.read().clone()
    }

    /// Forget every registered name.
    pub fn clear(&self) {
        self.names.write().clear();
    }
}

/// The set of collaborators handed to an engine.
#[derive(Clone)]
pub struct Hooks {
    /// Mints anti-forgery tokens.
    pub tokens: Arc<dyn TokenMinter>,
    /// Minifies bundles in production mode.
    pub minifier: Arc<dyn Minifier>,
    /// Assets registered by UI helpers.
    pub helpers: HelperBundles,
}

impl Hooks {
    /// Set the [`TokenMinter`].
    ///
    /// Returns the [`Hooks`], so additional methods may be chained.
    pub fn with_tokens(mut self, tokens: impl TokenMinter + 'static) -> Self {
        self.tokens = Arc::new(tokens);
        self
    }

    /// Set the [`Minifier`].
    pub fn with_minifier(mut self, minifier: impl Minifier + 'static) -> Self {
        self.minifier = Arc::new(minifier);
        self
    }

    /// Set the [`HelperBundles`] registry.
    pub fn with_helpers(mut self, helpers: HelperBundles) -> Self {
        self.helpers = helpers;
        self
    }
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            tokens: Arc::new(OneTimeTokens::default()),
            minifier: Arc::new(Concatenate),
            helpers: HelperBundles::default(),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("helpers", &self.helpers)
            .finish_non_exhaustive()
    }
}
