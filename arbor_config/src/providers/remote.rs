//! Remote coordination-store substitution source.

use std::collections::BTreeMap;

use thiserror::Error;

/// Failure reported by a remote store client.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct RemoteKvError {
    reason: String,
}

impl RemoteKvError {
    /// Creates an error carrying the client's own description.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Black-box read interface over the distributed coordination store.
///
/// Implementations own session establishment and must bound any blocking
/// connect with their own timeout, surfacing expiry as [`RemoteKvError`].
/// The resolver never substitutes a stale or default value for a failed
/// fetch; the whole pass fails instead.
pub trait RemoteKv: Send + Sync {
    /// Reads the leaf value stored at `path`.
    ///
    /// `Ok(None)` means the store was reachable and the key is absent.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteKvError`] when the store cannot be reached within
    /// the client's connect/read bounds.
    fn fetch(&self, path: &str) -> Result<Option<String>, RemoteKvError>;
}

/// Map-backed store used by tests and single-process deployments.
#[derive(Debug, Clone, Default)]
pub struct StaticRemote {
    entries: BTreeMap<String, String>,
}

impl StaticRemote {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing any previous value at the path.
    #[must_use]
    pub fn with(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(path.into(), value.into());
        self
    }
}

impl RemoteKv for StaticRemote {
    fn fetch(&self, path: &str) -> Result<Option<String>, RemoteKvError> {
        Ok(self.entries.get(path).cloned())
    }
}

/// Placeholder client for deployments without a coordination store.
///
/// Every fetch fails, so `from_zk` markers surface a configuration error
/// instead of silently resolving against nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRemote;

impl RemoteKv for NoRemote {
    fn fetch(&self, _path: &str) -> Result<Option<String>, RemoteKvError> {
        Err(RemoteKvError::new("no remote store configured"))
    }
}
