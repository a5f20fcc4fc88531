use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Records which views each compiled view was built from.
///
/// Only master pages create edges. A partial inclusion does not, so editing a
/// partial does not rebuild the views that include it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    /// Create a new, empty [`DependencyGraph`].
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the dependencies of `view`.
    ///
    /// An empty set removes the view from the graph.
    pub fn set(&mut self, view: &str, dependencies: BTreeSet<String>) {
        if dependencies.is_empty() {
            self.edges.remove(view);
        } else {
            self.edges.insert(view.to_string(), dependencies);
        }
    }

    /// Record that `view` depends on `dependency`.
    pub fn add(&mut self, view: &str, dependency: &str) {
        self.edges
            .entry(view.to_string())
            .or_default()
            .insert(dependency.to_string());
    }

    /// Return the views `view` depends on.
    pub fn dependencies_of(&self, view: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(view)
    }

    /// Return every view that depends on `dependency`, in name order.
    pub fn dependents(&self, dependency: &str) -> Vec<String> {
        self.edges
            .iter()
            .filter(|(_, set)| set.contains(dependency))
            .map(|(view, _)| view.clone())
            .collect()
    }

    /// Return the number of views with at least one dependency.
    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Return true if no view has a dependency.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependents() {
        let mut graph = DependencyGraph::new();
        graph.add("Views/Home", "Views/Shared/Layout");
        graph.add("Views/About", "Views/Shared/Layout");
        graph.add("Views/About", "Views/Shared/Base");

        assert_eq!(
            graph.dependents("Views/Shared/Layout"),
            vec!["Views/About", "Views/Home"]
        );
        assert_eq!(graph.dependents("Views/Shared/Base"), vec!["Views/About"]);
        assert!(graph.dependents("Views/Home").is_empty());
    }

    #[test]
    fn test_set_replaces() {
        let mut graph = DependencyGraph::new();
        graph.add("Views/Home", "Views/Shared/Layout");
        graph.set("Views/Home", BTreeSet::from(["Views/Shared/Other".to_string()]));

        assert!(graph.dependents("Views/Shared/Layout").is_empty());

        graph.set("Views/Home", BTreeSet::new());
        assert!(graph.is_empty());
    }

    #[test]
    fn test_serializes_as_map() {
        let mut graph = DependencyGraph::new();
        graph.add("Views/Home", "Views/Shared/Layout");

        assert_eq!(
            serde_json::to_string(&graph).unwrap(),
            r#"{"Views/Home":["Views/Shared/Layout"]}"#
        );
    }
}
