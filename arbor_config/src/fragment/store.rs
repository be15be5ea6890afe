//! Ordered fragment sources backing the merger and the resolver.

use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use super::{Fragment, parse_fragment};
use crate::error::ArborError;

/// Read-only provider of configuration fragments.
///
/// `load` must yield fragments in a deterministic order that is stable
/// across runs for the same input set; the merger consumes nothing beyond
/// that ordering. `load_path` backs indirect inclusion, where a marker
/// names a fragment file through an environment variable.
pub trait FragmentSource {
    /// Loads every fragment in merge order.
    ///
    /// # Errors
    ///
    /// Returns [`ArborError::Load`] when any fragment cannot be read or
    /// parsed; a partially applied configuration is unsafe, so one bad
    /// fragment fails the whole set.
    fn load(&self) -> Result<Vec<Fragment>, ArborError>;

    /// Loads a single fragment by filesystem path.
    ///
    /// # Errors
    ///
    /// Returns [`ArborError::Load`] when the file is unreadable or
    /// malformed.
    fn load_path(&self, path: &Utf8Path) -> Result<Fragment, ArborError>;
}

/// Loads `*.toml` fragments from one directory, ordered lexicographically
/// by file name.
///
/// The sortable-prefix convention (`000-base.toml`, `010-override.toml`)
/// is the only ordering signal: the file name is the fragment's order key.
#[derive(Debug, Clone)]
pub struct DirSource {
    dir: Utf8PathBuf,
}

impl DirSource {
    /// Creates a source reading fragments from `dir`.
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn fragment_paths(&self) -> Result<Vec<Utf8PathBuf>, ArborError> {
        let entries =
            fs::read_dir(&self.dir).map_err(|e| ArborError::load(self.dir.clone(), e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let raw = entry
                .map_err(|e| ArborError::load(self.dir.clone(), e))?
                .path();
            let path = Utf8PathBuf::from_path_buf(raw).map_err(|p| {
                ArborError::load(
                    self.dir.clone(),
                    std::io::Error::other(format!("non-UTF-8 file name: {}", p.display())),
                )
            })?;
            if path.extension() == Some("toml") && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl FragmentSource for DirSource {
    fn load(&self) -> Result<Vec<Fragment>, ArborError> {
        let mut fragments = Vec::new();
        for path in self.fragment_paths()? {
            let key = path.file_name().unwrap_or(path.as_str());
            let text = fs::read_to_string(&path).map_err(|e| ArborError::load(path.clone(), e))?;
            fragments.push(parse_fragment(key, &text)?);
        }
        Ok(fragments)
    }

    fn load_path(&self, path: &Utf8Path) -> Result<Fragment, ArborError> {
        let text = fs::read_to_string(path).map_err(|e| ArborError::load(path, e))?;
        parse_fragment(path.as_str(), &text)
    }
}

/// In-memory fragment source for tests and embedded callers.
///
/// Fragments are merged in order of their keys; `with_file` entries back
/// [`FragmentSource::load_path`] without touching the filesystem.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    fragments: Vec<Fragment>,
    files: BTreeMap<Utf8PathBuf, String>,
}

impl StaticSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and appends a fragment under the given order key.
    ///
    /// # Errors
    ///
    /// Returns [`ArborError::Load`] or [`ArborError::Malformed`] when the
    /// text is not a valid fragment.
    pub fn with_fragment(mut self, key: &str, text: &str) -> Result<Self, ArborError> {
        self.fragments.push(parse_fragment(key, text)?);
        Ok(self)
    }

    /// Registers raw fragment text under a virtual file path.
    ///
    /// The text is parsed lazily by [`FragmentSource::load_path`], so a
    /// malformed file surfaces exactly when an indirect inclusion reaches
    /// it, as it would on disk.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<Utf8PathBuf>, text: impl Into<String>) -> Self {
        self.files.insert(path.into(), text.into());
        self
    }
}

impl FragmentSource for StaticSource {
    fn load(&self) -> Result<Vec<Fragment>, ArborError> {
        let mut fragments = self.fragments.clone();
        fragments.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(fragments)
    }

    fn load_path(&self, path: &Utf8Path) -> Result<Fragment, ArborError> {
        let text = self.files.get(path).ok_or_else(|| {
            ArborError::load(path, std::io::Error::other("no such fragment file"))
        })?;
        parse_fragment(path.as_str(), text)
    }
}
