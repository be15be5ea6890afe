//! Path-keyed merging of ordered fragments into one tree.
//!
//! Later fragments win: for any path, the value and marker visible after
//! merging are those of the highest-ordered fragment defining that path.
//! Fragments that do not mention a path leave prior definitions untouched
//! (sparse override), except where a node carries the `replace` directive,
//! which discards all previously merged children at its path first.

use tracing::debug;

use crate::fragment::Fragment;
use crate::tree::Node;

/// Folds ordered fragments into one merged tree.
///
/// The caller supplies fragments in merge order; equal order keys are not
/// rejected, the fragment processed last simply wins.
#[must_use]
pub fn merge_fragments(fragments: impl IntoIterator<Item = Fragment>) -> Node {
    let mut root = Node::named("");
    for fragment in fragments {
        debug!(fragment = %fragment.key, "merging fragment");
        merge_node(&mut root, fragment.root);
    }
    root
}

/// Merges an overlay node into `base` under the later-wins rule.
///
/// Defining a value or a marker replaces the pair as a unit, so a later
/// literal clears an earlier substitution marker and vice versa. Sibling
/// sets are merged pairwise only when both sides hold a single child of a
/// name; once either side holds duplicates the overlay's set replaces the
/// base's wholesale.
pub(crate) fn merge_node(base: &mut Node, overlay: Node) {
    if overlay.replace {
        base.children.clear();
    }
    if overlay.value.is_some() || overlay.marker.is_some() {
        base.value = overlay.value;
        base.marker = overlay.marker;
    }

    for (name, mut bucket) in group_by_name(overlay.children) {
        let base_count = base.children.iter().filter(|c| c.name == name).count();
        if base_count == 1 && bucket.len() == 1 {
            if let (Some(slot), Some(child)) = (
                base.children.iter_mut().find(|c| c.name == name),
                bucket.pop(),
            ) {
                merge_node(slot, child);
            }
        } else if base_count == 0 {
            base.children.extend(bucket.into_iter().map(sanitized));
        } else {
            let first = base.children.iter().position(|c| c.name == name);
            base.children.retain(|c| c.name != name);
            let fresh = bucket.into_iter().map(sanitized);
            match first {
                Some(index) => {
                    let mut slot_index = index;
                    for node in fresh {
                        base.children.insert(slot_index, node);
                        slot_index += 1;
                    }
                }
                None => base.children.extend(fresh),
            }
        }
    }
}

/// Groups children by name, preserving first-occurrence order.
fn group_by_name(children: Vec<Node>) -> Vec<(String, Vec<Node>)> {
    let mut groups: Vec<(String, Vec<Node>)> = Vec::new();
    for child in children {
        match groups.iter_mut().find(|(name, _)| *name == child.name) {
            Some((_, bucket)) => bucket.push(child),
            None => groups.push((child.name.clone(), vec![child])),
        }
    }
    groups
}

/// Clears merge directives from a subtree before it is stored.
///
/// The `replace` flag is an instruction to the merger, not tree state; a
/// stored node must compare equal regardless of how it arrived.
fn sanitized(mut node: Node) -> Node {
    node.replace = false;
    let children = std::mem::take(&mut node.children);
    node.children = children.into_iter().map(sanitized).collect();
    node
}
