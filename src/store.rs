use crate::{
    log::{error_io, error_no_view_roots, Error},
    template::Template,
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Loads templates from a set of view roots.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    /// View roots that resolved to a readable directory.
    roots: Vec<PathBuf>,
    /// Template file extension, without the leading dot.
    extension: String,
}

impl TemplateStore {
    /// Create a new [`TemplateStore`] over the given view roots.
    ///
    /// Roots that are missing or are not directories are skipped.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] of kind [`ErrorKind::Configuration`][`crate::ErrorKind`]
    /// when none of the roots resolve.
    pub fn new<P>(roots: &[P], extension: &str) -> Result<Self, Error>
    where
        P: AsRef<Path>,
    {
        let resolved: Vec<PathBuf> = roots
            .iter()
            .filter_map(|root| {
                let root = root.as_ref();
                match fs::canonicalize(root) {
                    Ok(path) if path.is_dir() => Some(path),
                    _ => {
                        warn!(root = %root.display(), "skipping unreadable view root");
                        None
                    }
                }
            })
            .collect();

        if resolved.is_empty() {
            return Err(error_no_view_roots(roots));
        }

        Ok(Self {
            roots: resolved,
            extension: extension.trim_start_matches('.').to_string(),
        })
    }

    /// Return the view roots this store reads from.
    #[inline]
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Return true if `path` has the template extension and sits under one of
    /// the view roots.
    pub fn is_template(&self, path: &Path) -> bool {
        let has_extension = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case(self.extension.as_str()));

        has_extension && self.root_of(path).is_some()
    }

    /// Load every template under every view root.
    ///
    /// Files that cannot be read are skipped with a warning. Roots are walked
    /// in order, so a later template with the same full name replaces an
    /// earlier one once the list is collected into a map.
    pub fn load(&self) -> Vec<Template> {
        let mut templates = vec![];

        for root in &self.roots {
            let before = templates.len();
            let walker = WalkDir::new(root)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!(error = %e, "skipping unreadable entry");
                        None
                    }
                });

            for entry in walker {
                let path = entry.path();
                if !entry.file_type().is_file() || !self.is_template(path) {
                    continue;
                }
                match read(root, path) {
                    Ok(template) => templates.push(template),
                    Err(e) => warn!(path = %path.display(), "{e:#}"),
                }
            }

            debug!(
                root = %root.display(),
                count = templates.len() - before,
                "loaded templates"
            );
        }

        templates
    }

    /// Load the single template at `path`.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the path is not under a view root or cannot
    /// be read.
    pub fn load_one(&self, path: &Path) -> Result<Template, Error> {
        let path = fs::canonicalize(path).map_err(|e| error_io(path, e))?;
        let root = self.root_of(&path).ok_or_else(|| {
            Error::build(format!("`{}` is not under a view root", path.display()))
                .with_kind(crate::ErrorKind::NotFound)
        })?;

        read(root, &path)
    }

    /// Return the view root containing `path`, preferring the deepest.
    fn root_of(&self, path: &Path) -> Option<&Path> {
        self.roots
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .map(PathBuf::as_path)
    }
}

/// Read the template at `path` under `root`.
fn read(root: &Path, path: &Path) -> Result<Template, Error> {
    let raw = fs::read_to_string(path).map_err(|e| error_io(path, e))?;

    Ok(Template::new(root, path, raw))
}
