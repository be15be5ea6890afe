//! Error types produced by the configuration resolver.

use std::fmt;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Identifies the substitution source a marker refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SourceKind {
    /// Process environment variables.
    Environment,
    /// The remote coordination store.
    Remote,
    /// A named top-level subtree of the same configuration tree.
    SelfReference,
    /// A fragment file located through an environment variable.
    IndirectPath,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Environment => "environment",
            Self::Remote => "remote store",
            Self::SelfReference => "self-reference",
            Self::IndirectPath => "indirect path",
        };
        f.write_str(label)
    }
}

/// Errors that can occur while loading, merging or resolving configuration.
///
/// Every resolution error is fatal to the whole pass: no variant is ever
/// downgraded to a default value, and a failed pass leaves the previously
/// published snapshot in effect.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArborError {
    /// A fragment could not be read or parsed.
    #[error("failed to load fragment '{path}': {source}")]
    Load {
        /// Path of the fragment that failed to load.
        path: Utf8PathBuf,
        /// Underlying I/O or TOML error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A fragment parsed but violates a structural rule.
    #[error("malformed fragment at '{at}': {message}")]
    Malformed {
        /// Fragment key and node path of the offending definition.
        at: String,
        /// Human-readable explanation of the rule violation.
        message: String,
    },

    /// A substitution source could not be reached.
    #[error("{kind} unavailable for key '{key}': {reason}")]
    Unavailable {
        /// Substitution source that was consulted.
        kind: SourceKind,
        /// Key or path requested from the source.
        key: String,
        /// Reason reported by the source.
        reason: String,
    },

    /// A substitution key had no value and the marker carries no default.
    #[error("{kind} key '{key}' not found while resolving '{at}'")]
    MissingKey {
        /// Substitution source that was consulted.
        kind: SourceKind,
        /// Key or path requested from the source.
        key: String,
        /// Dotted path of the node awaiting the value.
        at: String,
    },

    /// Self-referential includes form a cycle.
    #[error("cyclic include detected: {chain}")]
    Cycle {
        /// Chain of include names participating in the cycle.
        chain: String,
    },

    /// Resolution did not reach a fixed point within the pass bound.
    #[error("substitution at '{at}' still unresolved after {passes} passes")]
    Unresolved {
        /// Dotted path of the first node still carrying a marker.
        at: String,
        /// Number of passes performed before giving up.
        passes: usize,
    },

    /// A settings lookup named a path with no resolved value.
    #[error("no resolved value at '{path}'")]
    NotFound {
        /// Dotted path that was requested.
        path: String,
    },
}

impl ArborError {
    /// Construct a [`ArborError::Load`] for a fragment path.
    pub(crate) fn load(
        path: impl Into<Utf8PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Load {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Construct a [`ArborError::Malformed`] with fragment and node context.
    pub(crate) fn malformed(at: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            at: at.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ArborError, SourceKind};

    #[test]
    fn display_includes_offending_key_and_path() {
        let err = ArborError::MissingKey {
            kind: SourceKind::Environment,
            key: "MAX_QUERY_SIZE".to_owned(),
            at: "settings.max_query_size".to_owned(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("MAX_QUERY_SIZE"));
        assert!(rendered.contains("settings.max_query_size"));
    }

    #[test]
    fn load_constructor_boxes_the_source() {
        let err = ArborError::load("conf.d/000-base.toml", std::io::Error::other("denied"));
        assert!(matches!(err, ArborError::Load { .. }));
        assert!(err.to_string().contains("000-base.toml"));
    }
}
