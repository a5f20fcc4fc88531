use crate::log::{error_io, Error, ErrorKind};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path, path::PathBuf, time::Duration};

/// Controls how `%%Bundle=name%%` directives expand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// One asset tag per file registered in the bundle.
    #[default]
    Authoring,
    /// One asset tag for the minified output of the whole bundle.
    Production,
}

/// Settings for a [`ViewEngine`][`crate::ViewEngine`].
///
/// Every field has a default, so a configuration file only needs to name what
/// it changes:
///
/// ```
/// use vellum::{Config, Mode};
///
/// let config = Config::from_json(r#"{ "view_roots": ["app/Views"], "mode": "production" }"#);
///
/// assert!(config.is_ok_and(|c| c.mode == Mode::Production && c.extension == "html"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories searched recursively for templates.
    pub view_roots: Vec<PathBuf>,
    /// File extension of templates, without the leading dot.
    pub extension: String,
    /// Web path that bare asset names are resolved under.
    pub resource_root: String,
    /// Subfolder of `resource_root` holding scripts.
    pub script_folder: String,
    /// Subfolder of `resource_root` holding style sheets.
    pub style_folder: String,
    /// Bundle expansion mode.
    pub mode: Mode,
    /// Named bundles and the asset paths registered to each, in order.
    pub bundles: BTreeMap<String, Vec<String>>,
    /// Web path that minified bundles are served under in production mode.
    pub bundle_route: String,
    /// Directory that web asset paths resolve against on disk.
    pub asset_root: PathBuf,
    /// Interval between readability checks while a changed file is locked.
    pub poll_interval_ms: u64,
    /// File the compiled view cache is persisted to, if any.
    pub cache_path: Option<PathBuf>,
}

impl Config {
    /// Parse a [`Config`] from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of kind [`ErrorKind::Configuration`] when the text
    /// is not a valid configuration.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        serde_json::from_str(text).map_err(|e| {
            Error::build("invalid configuration")
                .with_kind(ErrorKind::Configuration)
                .with_help(e.to_string())
        })
    }

    /// Read and parse a [`Config`] from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| error_io(path, e))?;

        Self::from_json(&text).map_err(|e| e.with_name(path.display().to_string()))
    }

    /// Add a view root.
    ///
    /// Returns the [`Config`], so additional methods may be chained.
    #[inline]
    pub fn with_view_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.view_roots.push(root.into());
        self
    }

    /// Set the bundle expansion [`Mode`].
    #[inline]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Register a bundle with the given asset paths.
    ///
    /// If a bundle with the given name already exists, it is overwritten.
    pub fn with_bundle<S, I, P>(mut self, name: S, paths: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.bundles
            .insert(name.into(), paths.into_iter().map(Into::into).collect());
        self
    }

    /// Set the directory that asset paths resolve against on disk.
    #[inline]
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }

    /// Set the file the compiled view cache is persisted to.
    #[inline]
    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = Some(path.into());
        self
    }

    /// Return the poll interval as a [`Duration`].
    #[inline]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            view_roots: vec![],
            extension: "html".into(),
            resource_root: "/Resources".into(),
            script_folder: "Scripts".into(),
            style_folder: "Styles".into(),
            mode: Mode::Authoring,
            bundles: BTreeMap::new(),
            bundle_route: "/Bundles".into(),
            asset_root: PathBuf::from("."),
            poll_interval_ms: 100,
            cache_path: None,
        }
    }
}
