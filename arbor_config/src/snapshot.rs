//! Versioned configuration snapshots and atomic reload.
//!
//! One resolution pass produces one immutable [`ConfigSnapshot`]. The
//! [`ConfigHandle`] publishes snapshots behind an `RwLock<Arc<_>>`: readers
//! clone the `Arc` and never observe a tree mid-mutation, while a failed
//! reload leaves the previously published snapshot authoritative.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use crate::access::{AccessScope, IdentityProfile};
use crate::error::ArborError;
use crate::fragment::FragmentSource;
use crate::merge::merge_fragments;
use crate::providers::{EnvSource, NoRemote, RemoteKv};
use crate::resolve::Resolver;
use crate::settings::SettingsIndex;
use crate::tree::Node;

/// Immutable result of one successful resolution pass.
///
/// Holds the resolved tree together with the projections built from it:
/// the flat settings index and the identity profiles. All accessors are
/// read-only; a new pass produces a new snapshot.
#[derive(Debug)]
pub struct ConfigSnapshot {
    version: u64,
    root: Node,
    settings: SettingsIndex,
    profiles: BTreeMap<String, IdentityProfile>,
    creator_visibility: bool,
}

impl ConfigSnapshot {
    fn build(version: u64, root: Node) -> Self {
        let settings = SettingsIndex::from_tree(&root);
        let profiles = root
            .child("users")
            .map(|users| {
                users
                    .children
                    .iter()
                    .map(|u| (u.name.clone(), IdentityProfile::from_node(u)))
                    .collect()
            })
            .unwrap_or_default();
        let creator_visibility = root
            .at_path("access_control.creator_visibility")
            .and_then(|n| n.value.as_deref())
            .is_some_and(|v| matches!(v, "1" | "true"));
        Self {
            version,
            root,
            settings,
            profiles,
            creator_visibility,
        }
    }

    /// Snapshot version; increases monotonically across successful reloads.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// The fully resolved tree.
    #[must_use]
    pub const fn root(&self) -> &Node {
        &self.root
    }

    /// The flat path → value settings projection.
    #[must_use]
    pub const fn settings(&self) -> &SettingsIndex {
        &self.settings
    }

    /// Looks up a runtime setting under the top-level `settings` node.
    ///
    /// # Errors
    ///
    /// Returns [`ArborError::NotFound`] when the setting has no resolved
    /// value.
    pub fn setting(&self, name: &str) -> Result<&str, ArborError> {
        self.settings.get(&format!("settings.{name}"))
    }

    /// The identity profile configured under `users.<identity>`, if any.
    #[must_use]
    pub fn profile(&self, identity: &str) -> Option<&IdentityProfile> {
        self.profiles.get(identity)
    }

    /// Derives the access scope for an identity.
    ///
    /// Identities without a profile, or with a profile carrying no
    /// allow-list, are unrestricted.
    #[must_use]
    pub fn scope(&self, identity: &str) -> AccessScope {
        AccessScope::new(identity, self.profile(identity), self.creator_visibility)
    }
}

/// Runs complete resolution passes against a fixed set of sources.
pub struct ConfigLoader {
    source: Box<dyn FragmentSource + Send + Sync>,
    remote: Box<dyn RemoteKv>,
    env: EnvSource,
}

impl ConfigLoader {
    /// Starts building a loader over the given fragment source.
    ///
    /// Defaults: no remote store (any `from_zk` marker fails) and the live
    /// process environment.
    #[must_use]
    pub fn builder(source: impl FragmentSource + Send + Sync + 'static) -> ConfigLoaderBuilder {
        ConfigLoaderBuilder {
            source: Box::new(source),
            remote: Box::new(NoRemote),
            env: EnvSource::process(),
        }
    }

    /// Runs one complete pass: load, merge, resolve, index.
    ///
    /// # Errors
    ///
    /// Propagates any [`ArborError`] raised while loading fragments or
    /// resolving markers; no partial configuration is ever returned.
    pub fn load(&self) -> Result<ConfigSnapshot, ArborError> {
        self.load_versioned(1)
    }

    fn load_versioned(&self, version: u64) -> Result<ConfigSnapshot, ArborError> {
        let fragments = self.source.load()?;
        let mut root = merge_fragments(fragments);
        Resolver::new(&self.env, self.remote.as_ref(), self.source.as_ref())
            .resolve(&mut root)?;
        Ok(ConfigSnapshot::build(version, root))
    }
}

/// Builder assembling a [`ConfigLoader`]'s substitution sources.
pub struct ConfigLoaderBuilder {
    source: Box<dyn FragmentSource + Send + Sync>,
    remote: Box<dyn RemoteKv>,
    env: EnvSource,
}

impl ConfigLoaderBuilder {
    /// Sets the remote coordination-store client.
    #[must_use]
    pub fn remote(mut self, remote: impl RemoteKv + 'static) -> Self {
        self.remote = Box::new(remote);
        self
    }

    /// Sets the environment source.
    #[must_use]
    pub fn env(mut self, env: EnvSource) -> Self {
        self.env = env;
        self
    }

    /// Finishes the builder.
    #[must_use]
    pub fn build(self) -> ConfigLoader {
        ConfigLoader {
            source: self.source,
            remote: self.remote,
            env: self.env,
        }
    }
}

/// Shared handle over the active snapshot, swapped atomically on reload.
pub struct ConfigHandle {
    loader: ConfigLoader,
    active: RwLock<Arc<ConfigSnapshot>>,
    versions: AtomicU64,
}

impl ConfigHandle {
    /// Loads the initial snapshot and wraps it in a handle.
    ///
    /// # Errors
    ///
    /// Propagates the first pass's [`ArborError`]; a handle never exists
    /// without a valid snapshot behind it.
    pub fn new(loader: ConfigLoader) -> Result<Self, ArborError> {
        let snapshot = loader.load_versioned(1)?;
        info!(version = snapshot.version(), "configuration loaded");
        Ok(Self {
            loader,
            active: RwLock::new(Arc::new(snapshot)),
            versions: AtomicU64::new(1),
        })
    }

    /// Returns the active snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<ConfigSnapshot> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Runs a fresh pass and publishes the result atomically.
    ///
    /// # Errors
    ///
    /// On failure the previously active snapshot stays authoritative and
    /// the error is returned to whatever triggered the reload.
    pub fn reload(&self) -> Result<Arc<ConfigSnapshot>, ArborError> {
        let version = self.versions.fetch_add(1, Ordering::Relaxed) + 1;
        match self.loader.load_versioned(version) {
            Ok(snapshot) => {
                let published = Arc::new(snapshot);
                let mut slot = self
                    .active
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                *slot = Arc::clone(&published);
                drop(slot);
                info!(version, "configuration reloaded");
                Ok(published)
            }
            Err(err) => {
                warn!(error = %err, "reload failed; previous snapshot remains active");
                Err(err)
            }
        }
    }
}
