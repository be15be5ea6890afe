//! The configuration node tree shared by fragments, merged trees and
//! resolved snapshots.
//!
//! A tree is an ordered hierarchy of named nodes. Each node may carry a
//! scalar value, a deferred-value [`Marker`], and an ordered list of
//! children. Children sharing a name are siblings, never merged within one
//! fragment; cross-fragment merging is the [`crate::merge`] module's job.

/// One node of a configuration tree.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Node {
    /// Element name within the parent.
    pub name: String,
    /// Scalar value carried by the node, if any.
    pub value: Option<String>,
    /// Deferred-value marker awaiting resolution, if any.
    pub marker: Option<Marker>,
    /// Merge directive: discard previously merged children at this path.
    pub replace: bool,
    /// Ordered children; duplicate names are siblings.
    pub children: Vec<Node>,
}

/// A deferred-value indicator naming a substitution source and key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// Which source supplies the value and under what key.
    pub kind: MarkerKind,
    /// Drop the node instead of failing when the source has no value.
    pub optional: bool,
}

/// The substitution sources a marker can refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerKind {
    /// Read a process environment variable, falling back to `default`.
    FromEnv {
        /// Name of the environment variable.
        var: String,
        /// Literal fallback used when the variable is unset.
        default: Option<String>,
    },
    /// Read a leaf value from the remote coordination store.
    FromRemote {
        /// Store path of the value.
        path: String,
    },
    /// Substitute a named top-level subtree of the same tree.
    Include {
        /// Name of the top-level node supplying the body.
        name: String,
    },
    /// Merge a fragment file whose path is held in an environment variable.
    IncludeFromEnv {
        /// Name of the environment variable holding the file path.
        var: String,
    },
}

impl Node {
    /// Creates an empty node with the given name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates a leaf node carrying a scalar value.
    #[must_use]
    pub fn leaf(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
            ..Self::default()
        }
    }

    /// Returns the first child with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Returns all children with the given name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Looks up a node by dotted path relative to this node.
    ///
    /// Each segment selects the first child with that name, so duplicate
    /// siblings are addressed by their leading occurrence.
    #[must_use]
    pub fn at_path(&self, path: &str) -> Option<&Self> {
        let mut node = self;
        for segment in path.split('.') {
            node = node.child(segment)?;
        }
        Some(node)
    }

    /// Returns `true` when this subtree still contains substitution markers.
    #[must_use]
    pub fn has_markers(&self) -> bool {
        self.marker.is_some() || self.children.iter().any(Self::has_markers)
    }

    /// Dotted path of the first marker in document order, if any remains.
    #[must_use]
    pub fn first_marker_path(&self) -> Option<String> {
        self.first_marker_from("")
    }

    fn first_marker_from(&self, prefix: &str) -> Option<String> {
        if self.marker.is_some() {
            return Some(prefix.to_owned());
        }
        self.children
            .iter()
            .find_map(|c| c.first_marker_from(&path_join(prefix, &c.name)))
    }
}

/// Joins a dotted path prefix with a child name.
pub(crate) fn path_join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::{Marker, MarkerKind, Node, path_join};

    fn sample_tree() -> Node {
        let mut settings = Node::named("settings");
        settings.children.push(Node::leaf("max_query_size", "33333"));
        settings.children.push(Node::leaf("readonly", "0"));
        let mut root = Node::named("");
        root.children.push(settings);
        root
    }

    #[test]
    fn at_path_walks_dotted_segments() {
        let root = sample_tree();
        let found = root.at_path("settings.max_query_size");
        assert_eq!(found.and_then(|n| n.value.as_deref()), Some("33333"));
        assert!(root.at_path("settings.missing").is_none());
    }

    #[test]
    fn children_named_preserves_document_order() {
        let mut root = Node::named("");
        root.children.push(Node::leaf("replica", "a"));
        root.children.push(Node::leaf("shard", "1"));
        root.children.push(Node::leaf("replica", "b"));
        let values: Vec<_> = root
            .children_named("replica")
            .filter_map(|n| n.value.as_deref())
            .collect();
        assert_eq!(values, ["a", "b"]);
    }

    #[test]
    fn first_marker_path_reports_document_order() {
        let mut root = sample_tree();
        let mut profile = Node::named("users");
        let mut user = Node::named("reader");
        user.marker = Some(Marker {
            kind: MarkerKind::FromEnv {
                var: "READER".to_owned(),
                default: None,
            },
            optional: false,
        });
        profile.children.push(user);
        root.children.push(profile);

        assert_eq!(root.first_marker_path().as_deref(), Some("users.reader"));
        assert!(sample_tree().first_marker_path().is_none());
    }

    #[test]
    fn path_join_skips_empty_prefix() {
        assert_eq!(path_join("", "settings"), "settings");
        assert_eq!(path_join("settings", "readonly"), "settings.readonly");
    }
}
