use rapidhash::fast::RapidHasher;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    hash::Hasher,
    path::{Component, Path, PathBuf},
};

/// Raw templates, keyed by full name.
pub type TemplateSet = BTreeMap<String, Template>;

/// Compiled views, keyed by full name. At most one entry per full name.
pub type CompiledViewSet = BTreeMap<String, CompiledView>;

/// Marks a view that bypasses the directive pipeline.
const FRAGMENT: &str = "Fragment";

/// A template as loaded from disk, before any directive processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// File stem of the template.
    pub name: String,
    /// Unique logical key, like `Views/Shared/Layout`.
    pub full_name: String,
    /// Where the template was read from.
    pub path: PathBuf,
    /// The unprocessed text.
    pub raw: String,
    /// Fingerprint of `raw`.
    pub hash: String,
}

impl Template {
    /// Create a [`Template`] read from `path` under the view `root`.
    pub fn new(root: &Path, path: &Path, raw: String) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            name,
            full_name: full_name(root, path),
            path: path.to_path_buf(),
            hash: fingerprint(&raw),
            raw,
        }
    }

    /// Return true if the template never enters the directive pipeline.
    #[inline]
    pub fn is_fragment(&self) -> bool {
        is_fragment(&self.full_name)
    }
}

/// The compiled form of a [`Template`], reused across renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledView {
    /// File stem of the template.
    pub name: String,
    /// Unique logical key, shared with the source [`Template`].
    pub full_name: String,
    /// Where the source template was read from.
    pub path: PathBuf,
    /// Text after the compile and after-compile passes.
    pub compiled: String,
    /// Fingerprint of the source text this view was compiled from.
    pub hash: String,
    /// Result of the most recent render, if any.
    pub rendered: Option<String>,
}

impl CompiledView {
    /// Create a [`CompiledView`] for `template` holding `compiled`.
    pub fn new(template: &Template, compiled: String) -> Self {
        Self {
            name: template.name.clone(),
            full_name: template.full_name.clone(),
            path: template.path.clone(),
            compiled,
            hash: template.hash.clone(),
            rendered: None,
        }
    }
}

/// Return true if the full name marks a fragment.
#[inline]
pub fn is_fragment(full_name: &str) -> bool {
    full_name.contains(FRAGMENT)
}

/// Return the content fingerprint of `text`.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = RapidHasher::default();
    hasher.write(text.as_bytes());

    format!("{:016x}", hasher.finish())
}

/// Return the logical full name of the template at `path`.
///
/// The name is the path relative to the parent of the view `root`, without
/// extension, joined with `/`. So `/app/Views/Shared/Layout.html` under the
/// root `/app/Views` is `Views/Shared/Layout`.
pub fn full_name(root: &Path, path: &Path) -> String {
    let base = root.parent().unwrap_or(root);
    let relative = path.strip_prefix(base).unwrap_or(path).with_extension("");

    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Return true if `full_name` is `wanted`, or ends with `/wanted`.
pub fn names_match(full_name: &str, wanted: &str) -> bool {
    let wanted = wanted.trim_start_matches('/');

    full_name == wanted
        || full_name
            .strip_suffix(wanted)
            .is_some_and(|prefix| prefix.ends_with('/'))
}

/// Find the entry called `wanted` in a map keyed by full name.
///
/// An exact key wins, otherwise the key ending in `/wanted` with the fewest
/// path components. Ties go to the key that sorts first.
pub fn resolve<'map, T>(map: &'map BTreeMap<String, T>, wanted: &str) -> Option<&'map T> {
    map.get(wanted).or_else(|| {
        map.iter()
            .filter(|(key, _)| names_match(key, wanted))
            .min_by_key(|(key, _)| key.matches('/').count())
            .map(|(_, value)| value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name() {
        let root = Path::new("/app/Views");

        assert_eq!(
            full_name(root, Path::new("/app/Views/Shared/Layout.html")),
            "Views/Shared/Layout"
        );
        assert_eq!(full_name(root, Path::new("/app/Views/Home.html")), "Views/Home");
    }

    #[test]
    fn test_new_template() {
        let template = Template::new(
            Path::new("/app/Views"),
            Path::new("/app/Views/Home/Index.html"),
            "<p>hi</p>".into(),
        );

        assert_eq!(template.name, "Index");
        assert_eq!(template.full_name, "Views/Home/Index");
        assert_eq!(template.hash, fingerprint("<p>hi</p>"));
        assert!(!template.is_fragment());
    }

    #[test]
    fn test_fragment() {
        assert!(is_fragment("Views/Home/ListFragment"));
        assert!(is_fragment("Views/Fragments/Row"));
        assert!(!is_fragment("Views/Home/Index"));
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        assert_eq!(fingerprint("a"), fingerprint("a"));
        assert_ne!(fingerprint("a"), fingerprint("b"));
        assert_eq!(fingerprint("a").len(), 16);
    }

    #[test]
    fn test_names_match() {
        assert!(names_match("Views/Shared/Layout", "Shared/Layout"));
        assert!(names_match("Views/Shared/Layout", "Views/Shared/Layout"));
        assert!(!names_match("Views/Shared/MyLayout", "Layout"));
        assert!(!names_match("Views/Shared/Layout", "Shared"));
    }

    #[test]
    fn test_resolve_prefers_exact() {
        let mut map = BTreeMap::new();
        map.insert("Admin/Home".to_string(), 1);
        map.insert("Home".to_string(), 2);

        assert_eq!(resolve(&map, "Home"), Some(&2));
        assert_eq!(resolve(&map, "Admin/Home"), Some(&1));
        assert_eq!(resolve(&map, "Other"), None);
    }

    #[test]
    fn test_resolve_prefers_closest_suffix() {
        let mut map = BTreeMap::new();
        map.insert("Views/Admin/Home".to_string(), 1);
        map.insert("Views/Home".to_string(), 2);
        map.insert("Views/Shared/Admin/Home".to_string(), 3);

        assert_eq!(resolve(&map, "Home"), Some(&2));
        assert_eq!(resolve(&map, "Admin/Home"), Some(&1));
    }
}
