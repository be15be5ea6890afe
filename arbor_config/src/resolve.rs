//! Fixed-point resolution of substitution markers.
//!
//! The resolver walks a merged tree depth-first in document order,
//! replacing each marker with the value its source supplies. Self-reference
//! and indirect inclusion introduce new structure (and possibly new
//! markers), so the walk repeats until no markers remain, bounded by
//! [`MAX_PASSES`]. Reference chains are tracked with explicit stacks so
//! cyclic configuration fails with [`ArborError::Cycle`] instead of
//! recursing unboundedly.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, warn};

use crate::error::{ArborError, SourceKind};
use crate::fragment::FragmentSource;
use crate::merge::merge_node;
use crate::providers::{EnvSource, RemoteKv};
use crate::tree::{MarkerKind, Node, path_join};

/// Upper bound on resolution passes before unresolved markers are fatal.
pub const MAX_PASSES: usize = 32;

/// Per-pass state: the include table snapshot and the active reference
/// chains used for cycle detection.
struct PassState {
    includes: BTreeMap<String, Node>,
    include_stack: Vec<String>,
    file_stack: Vec<Utf8PathBuf>,
    changed: usize,
}

/// Replaces substitution markers in a merged tree, in place.
///
/// Resolution is total-or-nothing: the first terminal failure aborts the
/// pass and the tree must be discarded by the caller, keeping whatever
/// snapshot was previously published.
pub struct Resolver<'a> {
    env: &'a EnvSource,
    remote: &'a dyn RemoteKv,
    source: &'a dyn FragmentSource,
}

impl<'a> Resolver<'a> {
    /// Creates a resolver over the given substitution sources.
    #[must_use]
    pub const fn new(
        env: &'a EnvSource,
        remote: &'a dyn RemoteKv,
        source: &'a dyn FragmentSource,
    ) -> Self {
        Self {
            env,
            remote,
            source,
        }
    }

    /// Resolves `root` to a fixed point.
    ///
    /// Resolving an already resolved tree is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ArborError::MissingKey`] for an absent key without a
    /// default, [`ArborError::Unavailable`] when the remote store cannot be
    /// reached, [`ArborError::Cycle`] for cyclic references,
    /// [`ArborError::Load`] when an indirectly included fragment fails to
    /// load, and [`ArborError::Unresolved`] when markers survive
    /// [`MAX_PASSES`] passes.
    pub fn resolve(&self, root: &mut Node) -> Result<(), ArborError> {
        let mut passes = 0usize;
        while root.has_markers() {
            if passes == MAX_PASSES {
                let at = root.first_marker_path().unwrap_or_default();
                warn!(%at, passes, "substitution did not reach a fixed point");
                return Err(ArborError::Unresolved { at, passes });
            }
            let mut state = PassState {
                includes: snapshot_includes(root),
                include_stack: Vec::new(),
                file_stack: Vec::new(),
                changed: 0,
            };
            self.resolve_children(root, "", &mut state)?;
            passes += 1;
            debug!(pass = passes, substitutions = state.changed, "resolution pass complete");
        }
        Ok(())
    }

    /// Resolves every child of `parent`, dropping children whose optional
    /// source had nothing to offer.
    fn resolve_children(
        &self,
        parent: &mut Node,
        path: &str,
        state: &mut PassState,
    ) -> Result<(), ArborError> {
        let children = std::mem::take(&mut parent.children);
        let mut kept = Vec::with_capacity(children.len());
        for mut child in children {
            let child_path = path_join(path, &child.name);
            if self.resolve_node(&mut child, &child_path, state)? {
                kept.push(child);
            }
        }
        parent.children = kept;
        Ok(())
    }

    /// Resolves the marker chain at one node, then recurses into its
    /// children. Returns `false` when the node must be dropped.
    fn resolve_node(
        &self,
        node: &mut Node,
        path: &str,
        state: &mut PassState,
    ) -> Result<bool, ArborError> {
        let mut pushed_includes = 0usize;
        let mut pushed_files = 0usize;
        let keep = loop {
            let Some(marker) = node.marker.clone() else {
                break true;
            };
            match marker.kind {
                MarkerKind::FromEnv { var, default } => {
                    node.marker = None;
                    state.changed += 1;
                    match self.env.lookup(&var).or(default) {
                        Some(value) => {
                            node.value = Some(value);
                            break true;
                        }
                        None if marker.optional => {
                            debug!(%path, %var, "dropping optional node: variable unset");
                            break false;
                        }
                        None => {
                            return Err(ArborError::MissingKey {
                                kind: SourceKind::Environment,
                                key: var,
                                at: path.to_owned(),
                            });
                        }
                    }
                }
                MarkerKind::FromRemote { path: store_path } => {
                    let fetched = self.remote.fetch(&store_path).map_err(|e| {
                        ArborError::Unavailable {
                            kind: SourceKind::Remote,
                            key: store_path.clone(),
                            reason: e.to_string(),
                        }
                    })?;
                    node.marker = None;
                    state.changed += 1;
                    match fetched {
                        Some(value) => {
                            node.value = Some(value);
                            break true;
                        }
                        None if marker.optional => {
                            debug!(%path, %store_path, "dropping optional node: key absent");
                            break false;
                        }
                        None => {
                            return Err(ArborError::MissingKey {
                                kind: SourceKind::Remote,
                                key: store_path,
                                at: path.to_owned(),
                            });
                        }
                    }
                }
                MarkerKind::Include { name } => {
                    if state.include_stack.iter().any(|n| *n == name) {
                        return Err(cycle_error(&state.include_stack, &name));
                    }
                    match state.includes.get(&name) {
                        None if marker.optional => {
                            node.marker = None;
                            state.changed += 1;
                            break false;
                        }
                        None => {
                            return Err(ArborError::MissingKey {
                                kind: SourceKind::SelfReference,
                                key: name,
                                at: path.to_owned(),
                            });
                        }
                        Some(target) => {
                            let body = target.clone();
                            state.include_stack.push(name);
                            pushed_includes += 1;
                            state.changed += 1;
                            node.value = body.value;
                            node.marker = body.marker;
                            node.children = body.children;
                            // The body may chain another marker; loop again.
                        }
                    }
                }
                MarkerKind::IncludeFromEnv { var } => {
                    node.marker = None;
                    state.changed += 1;
                    match self.env.lookup(&var) {
                        None if marker.optional => {
                            debug!(%path, %var, "dropping optional node: variable unset");
                            break false;
                        }
                        None => {
                            return Err(ArborError::MissingKey {
                                kind: SourceKind::IndirectPath,
                                key: var,
                                at: path.to_owned(),
                            });
                        }
                        Some(file) => {
                            let file_path = Utf8PathBuf::from(file);
                            if state.file_stack.iter().any(|p| *p == file_path) {
                                return Err(cycle_error_paths(&state.file_stack, &file_path));
                            }
                            let fragment = self.source.load_path(Utf8Path::new(&file_path))?;
                            state.file_stack.push(file_path);
                            pushed_files += 1;
                            merge_node(node, fragment.root);
                            break true;
                        }
                    }
                }
            }
        };
        if keep {
            self.resolve_children(node, path, state)?;
        }
        for _ in 0..pushed_includes {
            state.include_stack.pop();
        }
        for _ in 0..pushed_files {
            state.file_stack.pop();
        }
        Ok(keep)
    }
}

/// Clones the root's top-level children as the self-reference table.
///
/// The snapshot is taken once per pass, so includes observe a consistent
/// view of the tree even while it is being rewritten.
fn snapshot_includes(root: &Node) -> BTreeMap<String, Node> {
    root.children
        .iter()
        .map(|c| (c.name.clone(), c.clone()))
        .collect()
}

fn cycle_error(stack: &[String], name: &str) -> ArborError {
    let chain = stack
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(name))
        .collect::<Vec<_>>()
        .join(" -> ");
    ArborError::Cycle { chain }
}

fn cycle_error_paths(stack: &[Utf8PathBuf], next: &Utf8Path) -> ArborError {
    let chain = stack
        .iter()
        .map(|p| p.as_str())
        .chain(std::iter::once(next.as_str()))
        .collect::<Vec<_>>()
        .join(" -> ");
    ArborError::Cycle { chain }
}
