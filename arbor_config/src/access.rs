//! Identity profiles and the access scope derived from them.
//!
//! A profile lives under `users.<identity>` in the resolved tree. The
//! optional `allow_databases` key restricts which top-level catalog entries
//! the identity may observe: an absent key means unrestricted visibility, a
//! present-but-empty list denies everything. Lack of visibility is total
//! and silent — filtered surfaces return empty results, never errors.

use std::collections::BTreeSet;

use crate::tree::Node;

/// Per-identity record carrying optional catalog visibility restrictions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProfile {
    name: String,
    allow_databases: Option<BTreeSet<String>>,
}

impl IdentityProfile {
    /// Parses the profile stored at a `users.<identity>` node.
    #[must_use]
    pub fn from_node(node: &Node) -> Self {
        let restricted = node.children_named("allow_databases").next().is_some();
        let allow_databases = restricted.then(|| {
            node.children_named("allow_databases")
                .filter_map(|n| n.value.clone())
                .collect()
        });
        Self {
            name: node.name.clone(),
            allow_databases,
        }
    }

    /// Identity this profile belongs to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The allow-list, when the identity is restricted.
    #[must_use]
    pub const fn allow_databases(&self) -> Option<&BTreeSet<String>> {
        self.allow_databases.as_ref()
    }
}

/// Visibility decisions for one identity against one snapshot.
///
/// Derived once per query via [`crate::ConfigSnapshot::scope`]; holding it
/// across reloads is safe because it owns its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessScope {
    identity: String,
    allow: Option<BTreeSet<String>>,
    creator_visibility: bool,
}

impl AccessScope {
    pub(crate) fn new(
        identity: &str,
        profile: Option<&IdentityProfile>,
        creator_visibility: bool,
    ) -> Self {
        Self {
            identity: identity.to_owned(),
            allow: profile.and_then(|p| p.allow_databases().cloned()),
            creator_visibility,
        }
    }

    /// Returns `true` when the named entry is visible to this identity.
    ///
    /// `created_by` is the creator tag supplied by the catalog; it grants
    /// visibility only when the creator-visibility rule is enabled in the
    /// snapshot.
    #[must_use]
    pub fn is_visible(&self, entry: &str, created_by: Option<&str>) -> bool {
        let Some(allow) = &self.allow else {
            return true;
        };
        allow.contains(entry)
            || (self.creator_visibility && created_by == Some(self.identity.as_str()))
    }

    /// Filters candidate `(name, creator)` pairs down to the visible names,
    /// preserving candidate order.
    #[must_use]
    pub fn visible_entries<'a>(
        &self,
        candidates: impl IntoIterator<Item = (&'a str, Option<&'a str>)>,
    ) -> Vec<&'a str> {
        candidates
            .into_iter()
            .filter(|(name, creator)| self.is_visible(name, *creator))
            .map(|(name, _)| name)
            .collect()
    }
}
