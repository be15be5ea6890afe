//! Flat projection of a resolved tree into queryable settings.

use std::collections::BTreeMap;

use crate::error::ArborError;
use crate::tree::{Node, path_join};

/// Read-only path → value index built once per resolution pass.
///
/// Point lookups answer "what is the current value of setting X" without
/// re-walking the tree. For duplicate sibling paths the later sibling wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsIndex {
    entries: BTreeMap<String, String>,
}

impl SettingsIndex {
    /// Builds the index over every valued node of a resolved tree.
    #[must_use]
    pub fn from_tree(root: &Node) -> Self {
        let mut entries = BTreeMap::new();
        collect(root, "", &mut entries);
        Self { entries }
    }

    /// Returns the resolved value at a dotted path.
    ///
    /// # Errors
    ///
    /// Returns [`ArborError::NotFound`] when the path has no resolved
    /// value.
    pub fn get(&self, path: &str) -> Result<&str, ArborError> {
        self.entries
            .get(path)
            .map(String::as_str)
            .ok_or_else(|| ArborError::NotFound {
                path: path.to_owned(),
            })
    }

    /// Iterates every `(path, value)` pair in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of resolved values in the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the tree holds no resolved values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn collect(node: &Node, prefix: &str, entries: &mut BTreeMap<String, String>) {
    for child in &node.children {
        let path = path_join(prefix, &child.name);
        if let Some(value) = &child.value {
            entries.insert(path.clone(), value.clone());
        }
        collect(child, &path, entries);
    }
}
