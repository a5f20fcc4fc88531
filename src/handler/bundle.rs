use super::{Directive, Pass};
use crate::{
    compile::scan::Token,
    config::{Config, Mode},
    hook::Minifier,
    log::{Error, MISSING_BUNDLE, UNKNOWN_ASSET},
};
use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::debug;

const INCLUDE: &str = "Include";
const BUNDLE: &str = "Bundle";

/// The kinds of asset a tag can be written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Asset {
    Script,
    Style,
}

impl Asset {
    /// Infer the kind of asset from the extension of `path`.
    fn of(path: &str) -> Option<Self> {
        let extension = Path::new(path).extension()?.to_str()?;
        if extension.eq_ignore_ascii_case("js") {
            Some(Self::Script)
        } else if extension.eq_ignore_ascii_case("css") {
            Some(Self::Style)
        } else {
            None
        }
    }

    /// Write the tag that loads `href`.
    fn tag(self, href: &str) -> String {
        match self {
            Self::Script => format!(r#"<script src="{href}" type="text/javascript"></script>"#),
            Self::Style => format!(r#"<link href="{href}" rel="stylesheet" type="text/css" />"#),
        }
    }
}

/// Resolves asset paths and bundles to tags.
///
/// Cloning shares the memoized minifier output.
#[derive(Clone)]
pub struct Assets {
    mode: Mode,
    resource_root: String,
    script_folder: String,
    style_folder: String,
    bundle_route: String,
    asset_root: PathBuf,
    bundles: Arc<BTreeMap<String, Vec<String>>>,
    minifier: Arc<dyn Minifier>,
    minified: Arc<RwLock<HashMap<String, String>>>,
}

impl Assets {
    /// Create a new [`Assets`] from the asset settings of `config`.
    pub fn new(config: &Config, minifier: Arc<dyn Minifier>) -> Self {
        Self {
            mode: config.mode,
            resource_root: config.resource_root.trim_end_matches('/').to_string(),
            script_folder: config.script_folder.trim_matches('/').to_string(),
            style_folder: config.style_folder.trim_matches('/').to_string(),
            bundle_route: config.bundle_route.trim_end_matches('/').to_string(),
            asset_root: config.asset_root.clone(),
            bundles: Arc::new(config.bundles.clone()),
            minifier,
            minified: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Return the web path of `path`.
    ///
    /// A bare file name is placed under the resource root, in the folder for
    /// its kind of asset. Anything containing a `/` is used as given.
    pub fn href(&self, path: &str) -> Result<String, Error> {
        if path.contains('/') {
            return Ok(path.to_string());
        }
        let folder = match self.kind(path)? {
            Asset::Script => &self.script_folder,
            Asset::Style => &self.style_folder,
        };

        Ok(format!("{}/{folder}/{path}", self.resource_root))
    }

    /// Return the tag that includes the asset at `path`.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the kind of asset cannot be inferred from
    /// the extension.
    pub fn include(&self, path: &str) -> Result<String, Error> {
        let kind = self.kind(path)?;

        Ok(kind.tag(&self.href(path)?))
    }

    /// Return the tags that load the bundle `name`.
    ///
    /// In authoring mode this is one tag per registered file, in production
    /// mode one tag for the minified bundle.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the bundle is not registered, one of its
    /// files has an unknown kind, or minification fails.
    pub fn bundle(&self, name: &str) -> Result<String, Error> {
        let files = self.files(name)?;
        match self.mode {
            Mode::Authoring => Ok(files
                .iter()
                .map(|file| self.include(file))
                .collect::<Result<Vec<_>, _>>()?
                .join("\n")),
            Mode::Production => {
                let kind = self.kind(name)?;
                self.minified(name)?;
                Ok(kind.tag(&format!("{}/{name}", self.bundle_route)))
            }
        }
    }

    /// Return the minified text of the bundle `name`, minifying it on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the bundle is not registered or the
    /// [`Minifier`] fails.
    pub fn minified(&self, name: &str) -> Result<String, Error> {
        if let Some(text) = self.minified.read().get(name) {
            return Ok(text.clone());
        }

        let paths = self
            .files(name)?
            .iter()
            .map(|file| self.href(file).map(|href| self.disk_path(&href)))
            .collect::<Result<Vec<_>, _>>()?;
        let text = self.minifier.minify(name, &paths)?;
        debug!(bundle = name, files = paths.len(), "minified bundle");

        self.minified.write().insert(name.to_string(), text.clone());
        Ok(text)
    }

    /// Return the files registered to the bundle `name`.
    fn files(&self, name: &str) -> Result<&[String], Error> {
        self.bundles.get(name).map(Vec::as_slice).ok_or_else(|| {
            Error::build(MISSING_BUNDLE).with_help(format!("no bundle named `{name}` is registered"))
        })
    }

    /// Return where the asset at web path `href` lives on disk.
    fn disk_path(&self, href: &str) -> PathBuf {
        self.asset_root.join(href.trim_start_matches('/'))
    }

    fn kind(&self, path: &str) -> Result<Asset, Error> {
        Asset::of(path).ok_or_else(|| {
            Error::build(UNKNOWN_ASSET)
                .with_help(format!("`{path}` must end in `.js` or `.css`"))
        })
    }
}

impl fmt::Debug for Assets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assets")
            .field("mode", &self.mode)
            .field("resource_root", &self.resource_root)
            .field("bundles", &self.bundles)
            .finish_non_exhaustive()
    }
}

/// Expands `%%Include=path%%` and `%%Bundle=name%%` into asset tags.
///
/// A bundle is expanded once per render pass, further directives for the same
/// bundle reuse the expansion.
#[derive(Debug, Clone)]
pub struct Bundle {
    assets: Assets,
}

impl Bundle {
    /// Create a new [`Bundle`] handler over `assets`.
    pub fn new(assets: Assets) -> Self {
        Self { assets }
    }
}

impl Directive for Bundle {
    fn names(&self) -> &[&'static str] {
        &[INCLUDE, BUNDLE]
    }

    fn apply(
        &self,
        token: &Token<'_>,
        buffer: &str,
        pass: &mut Pass<'_>,
    ) -> Result<Option<String>, Error> {
        let view = pass.view;
        let point = |e: Error| e.with_pointer(buffer, token.region).with_name(view);

        let tags = if token.name == INCLUDE {
            self.assets.include(token.value).map_err(point)?
        } else {
            let key = format!("{BUNDLE}={}", token.value);
            match pass.recall(&key) {
                Some(tags) => tags.to_string(),
                None => {
                    let tags = self.assets.bundle(token.value).map_err(point)?;
                    pass.remember(key, tags.clone());
                    tags
                }
            }
        };

        Ok(Some(token.region.splice(buffer, &tags)))
    }
}
