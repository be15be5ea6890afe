//! Hierarchical configuration resolution for Rust services.
//!
//! `arbor_config` merges ordered TOML fragments into one authoritative
//! tree, resolves deferred values from four substitution sources — the
//! process environment (`from_env`), a remote coordination store
//! (`from_zk`), named subtrees of the same tree (`incl`), and indirectly
//! located fragment files (`include_from_env`) — then projects the
//! resolved tree into flat runtime settings and per-identity catalog
//! visibility rules.
//!
//! Resolution is all-or-nothing: any failure aborts the whole pass and the
//! previously published snapshot stays in effect, so readers never observe
//! a torn configuration.
//!
//! # Examples
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use arbor_config::{ConfigLoader, EnvSource, StaticSource};
//!
//! # fn main() -> Result<(), arbor_config::ArborError> {
//! let source = StaticSource::new().with_fragment(
//!     "000-base",
//!     "[settings]\nmax_query_size = { from_env = \"MAX_QUERY_SIZE\", default = 262144 }\n",
//! )?;
//! let env = EnvSource::with_overrides(BTreeMap::from([(
//!     "MAX_QUERY_SIZE".to_owned(),
//!     "55555".to_owned(),
//! )]));
//! let snapshot = ConfigLoader::builder(source).env(env).build().load()?;
//! assert_eq!(snapshot.setting("max_query_size")?, "55555");
//! # Ok(())
//! # }
//! ```

mod access;
mod catalog;
mod error;
mod fragment;
mod merge;
mod providers;
mod resolve;
mod settings;
mod snapshot;
mod tree;

pub use access::{AccessScope, IdentityProfile};
pub use catalog::{Catalog, Column, Database, Part, SystemViews, Table};
pub use error::{ArborError, SourceKind};
pub use fragment::{DirSource, Fragment, FragmentSource, StaticSource, parse_fragment};
pub use merge::merge_fragments;
pub use providers::{EnvSource, NoRemote, RemoteKv, RemoteKvError, StaticRemote};
pub use resolve::{MAX_PASSES, Resolver};
pub use settings::SettingsIndex;
pub use snapshot::{ConfigHandle, ConfigLoader, ConfigLoaderBuilder, ConfigSnapshot};
pub use tree::{Marker, MarkerKind, Node};
