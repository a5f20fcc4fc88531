use crate::{
    cache::Snapshot,
    compile::ViewCompiler,
    config::Config,
    handler::{Assets, Handlers},
    hook::{HelperBundles, Hooks},
    log::Error,
    normalize::normalize,
    store::TemplateStore,
    tags::Tags,
    watch::{self, WatchHandle},
};
use parking_lot::{RwLock, RwLockReadGuard};
use std::{
    fmt,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tracing::{debug, info, warn};

/// Loads, compiles and renders the views under a set of view roots.
///
/// A [`ViewEngine`] is a cheap handle, clones share the same views. Renders
/// take a read lock on the compiled views, so they run concurrently with each
/// other and wait only while a change is being applied.
///
/// # Examples
///
/// ```no_run
/// use vellum::{hook::Hooks, Config, Tags, ViewEngine};
///
/// let config = Config::default().with_view_root("app/Views");
/// let engine = ViewEngine::new(config, Hooks::default(), None)?;
///
/// let html = engine.load_view("Home/Index", Some(&Tags::new().with("title", "Home")))?;
/// # Ok::<(), vellum::Error>(())
/// ```
#[derive(Clone)]
pub struct ViewEngine {
    shared: Arc<Shared>,
}

struct Shared {
    config: Config,
    store: TemplateStore,
    assets: Assets,
    hooks: Hooks,
    compiler: RwLock<ViewCompiler>,
    /// Set when the views changed since the cache was last taken.
    stale: AtomicBool,
}

impl ViewEngine {
    /// Create a new [`ViewEngine`] with the standard handlers.
    ///
    /// When `cache` holds a snapshot, the views are restored from it and
    /// nothing is read from the view roots. Otherwise every template is
    /// loaded and compiled.
    ///
    /// The engine does not follow changes to the view roots on its own. Call
    /// [`ViewEngine::watch`] and keep the [`WatchHandle`] for as long as
    /// changes should be applied.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of kind
    /// [`ErrorKind::Configuration`][`crate::ErrorKind::Configuration`] when
    /// none of the view roots resolve.
    pub fn new(config: Config, hooks: Hooks, cache: Option<&str>) -> Result<Self, Error> {
        Self::with_handlers(config, hooks, cache, |handlers| handlers)
    }

    /// Create a new [`ViewEngine`], letting `extend` register handlers after
    /// the standard set.
    ///
    /// # Errors
    ///
    /// Returns the same [`Error`] as [`ViewEngine::new`].
    pub fn with_handlers<F>(
        config: Config,
        hooks: Hooks,
        cache: Option<&str>,
        extend: F,
    ) -> Result<Self, Error>
    where
        F: FnOnce(Handlers) -> Handlers,
    {
        let snapshot = match cache.map(Snapshot::parse).transpose() {
            Ok(snapshot) => snapshot.flatten(),
            Err(e) => {
                warn!("{e:#}");
                None
            }
        };

        Self::open(config, hooks, snapshot, extend)
    }

    /// Create a new [`ViewEngine`] with the standard handlers, restoring from
    /// the cache file named by [`Config::cache_path`] when it holds a
    /// snapshot.
    ///
    /// After a cold compile the cache file is written. As with
    /// [`ViewEngine::new`], changes are only followed once
    /// [`ViewEngine::watch`] is called.
    ///
    /// # Errors
    ///
    /// Returns the same [`Error`] as [`ViewEngine::new`], or an [`Error`]
    /// when the cache file cannot be written.
    pub fn from_config(config: Config, hooks: Hooks) -> Result<Self, Error> {
        let snapshot = config.cache_path.as_deref().and_then(Snapshot::read);
        let engine = Self::open(config, hooks, snapshot, |handlers| handlers)?;
        if engine.is_stale() {
            engine.persist()?;
        }

        Ok(engine)
    }

    fn open<F>(
        config: Config,
        hooks: Hooks,
        snapshot: Option<Snapshot>,
        extend: F,
    ) -> Result<Self, Error>
    where
        F: FnOnce(Handlers) -> Handlers,
    {
        let store = TemplateStore::new(&config.view_roots, &config.extension)?;
        let assets = Assets::new(&config, hooks.minifier.clone());
        let handlers = extend(Handlers::standard(&assets, &hooks));

        let (compiler, stale) = match snapshot {
            Some(snapshot) => {
                let compiler = ViewCompiler::restore(snapshot, handlers);
                info!(views = compiler.compiled_views().len(), "restored view cache");
                (compiler, false)
            }
            None => {
                let mut compiler = ViewCompiler::new(store.load(), handlers);
                let count = compiler.compile_all();
                info!(
                    views = count,
                    templates = compiler.templates().len(),
                    "compiled views"
                );
                (compiler, true)
            }
        };

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                store,
                assets,
                hooks,
                compiler: RwLock::new(compiler),
                stale: AtomicBool::new(stale),
            }),
        })
    }

    /// Render the view called `name` and return the finished markup.
    ///
    /// The rendered text is normalized when it is well-formed markup, and
    /// returned as rendered otherwise.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of kind
    /// [`ErrorKind::NotFound`][`crate::ErrorKind::NotFound`] when no such
    /// view is compiled, or the [`Error`] a render handler returns.
    pub fn load_view(&self, name: &str, tags: Option<&Tags>) -> Result<String, Error> {
        let rendered = self.shared.compiler.read().evaluate(name, tags)?;
        self.shared.compiler.write().remember(name, rendered.clone());

        match normalize(&rendered) {
            Ok(normalized) => Ok(normalized),
            Err(e) => {
                debug!(view = name, error = %e, "returning unnormalized markup");
                Ok(rendered)
            }
        }
    }

    /// Return the current state serialized as a cache, and mark it fresh.
    pub fn get_cache(&self) -> String {
        let json = self.shared.compiler.read().snapshot().to_json();
        self.shared.stale.store(false, Ordering::SeqCst);

        json
    }

    /// Return true if the views changed since the cache was last taken.
    #[inline]
    pub fn is_stale(&self) -> bool {
        self.shared.stale.load(Ordering::SeqCst)
    }

    /// Write the cache to [`Config::cache_path`].
    ///
    /// Returns false when no cache path is configured.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the cache file cannot be written.
    pub fn persist(&self) -> Result<bool, Error> {
        let Some(path) = &self.shared.config.cache_path else {
            return Ok(false);
        };
        let snapshot = self.shared.compiler.read().snapshot();
        snapshot.write(path)?;
        self.shared.stale.store(false, Ordering::SeqCst);
        debug!(path = %path.display(), "persisted view cache");

        Ok(true)
    }

    /// Reload the template at `path` and rebuild the views it affects.
    ///
    /// Returns the full names of the views that compiled, which is empty
    /// when the content did not change.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when `path` is not a readable file under a view
    /// root.
    pub fn apply_change(&self, path: &Path) -> Result<Vec<String>, Error> {
        let template = self.shared.store.load_one(path)?;
        let name = template.full_name.clone();
        let rebuilt = self.shared.compiler.write().update(template);

        if !rebuilt.is_empty() {
            self.shared.stale.store(true, Ordering::SeqCst);
            info!(view = %name, rebuilt = rebuilt.len(), "applied template change");
        }

        Ok(rebuilt)
    }

    /// Start watching the view roots, applying every change to a template
    /// as it happens.
    ///
    /// Watching stops when the returned [`WatchHandle`] is dropped.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the change notification cannot be set up.
    pub fn watch(&self) -> Result<WatchHandle, Error> {
        watch::spawn(self.clone())
    }

    /// Return the minified text of the bundle `name`.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the bundle is not registered or cannot be
    /// minified.
    pub fn bundle(&self, name: &str) -> Result<String, Error> {
        self.shared.assets.minified(name)
    }

    /// Return the registry UI helpers add assets to.
    #[inline]
    pub fn helper_bundles(&self) -> &HelperBundles {
        &self.shared.hooks.helpers
    }

    /// Return the [`Config`] the engine was created with.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Return the [`TemplateStore`] that templates are loaded with.
    #[inline]
    pub fn store(&self) -> &TemplateStore {
        &self.shared.store
    }

    /// Lock and return the [`ViewCompiler`] for reading.
    pub fn compiler(&self) -> RwLockReadGuard<'_, ViewCompiler> {
        self.shared.compiler.read()
    }
}

impl fmt::Debug for ViewEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewEngine")
            .field("roots", &self.shared.store.roots())
            .field("stale", &self.is_stale())
            .finish_non_exhaustive()
    }
}
