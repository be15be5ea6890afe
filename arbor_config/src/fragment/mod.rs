//! Configuration fragments: TOML parsing and ordered fragment sources.

mod parser;
mod store;

pub use parser::parse_fragment;
pub use store::{DirSource, FragmentSource, StaticSource};

use crate::tree::Node;

/// One unit of configuration input, merged in load order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Sortable load-order key, typically the file name.
    pub key: String,
    /// Parsed fragment body; the unnamed root holds the top-level nodes.
    pub root: Node,
}

#[cfg(test)]
mod tests;
