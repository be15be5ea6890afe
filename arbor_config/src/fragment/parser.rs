//! TOML to node-tree conversion.
//!
//! A fragment is an ordinary TOML document. Tables become nodes, scalars
//! become leaf values (stringified on load), and a handful of reserved keys
//! express substitution markers and merge directives:
//!
//! - `from_env`, `from_zk`, `incl`, `include_from_env` select the
//!   substitution source (at most one per node);
//! - `default` supplies a literal fallback for `from_env`;
//! - `optional` drops the node instead of failing when the source is empty;
//! - `replace` discards previously merged children at the node's path.
//!
//! `default` and `optional` are reserved only next to a marker key, so
//! tables like `[users.default]` keep their ordinary meaning.

use toml::Value;

use super::Fragment;
use crate::error::ArborError;
use crate::tree::{Marker, MarkerKind, Node, path_join};

/// Directive keys plucked from a table before its children are converted.
struct Directives {
    from_env: Option<String>,
    from_zk: Option<String>,
    incl: Option<String>,
    include_from_env: Option<String>,
    default: Option<String>,
    optional: bool,
    replace: bool,
}

/// Parses a TOML fragment into a node tree.
///
/// `key` is the fragment's load-order key and is used verbatim in error
/// context so authoring mistakes point at the offending file.
///
/// # Errors
///
/// Returns [`ArborError::Load`] when the document is not valid TOML and
/// [`ArborError::Malformed`] when a directive rule is violated.
pub fn parse_fragment(key: &str, text: &str) -> Result<Fragment, ArborError> {
    let value: Value = toml::from_str(text).map_err(|e| ArborError::load(key, e))?;
    let Value::Table(table) = value else {
        return Err(ArborError::malformed(key, "fragment root must be a table"));
    };
    let root = convert_table(String::new(), table, key, "")?;
    Ok(Fragment {
        key: key.to_owned(),
        root,
    })
}

fn directive_context(fragment: &str, path: &str) -> String {
    if path.is_empty() {
        fragment.to_owned()
    } else {
        format!("{fragment}:{path}")
    }
}

/// The keys selecting a substitution source.
const MARKER_KEYS: [&str; 4] = ["from_env", "from_zk", "incl", "include_from_env"];

/// Extracts the reserved directive keys from a table, validating their types.
///
/// `default` and `optional` are only directives alongside a marker key;
/// in any other table they are ordinary child names (`[users.default]` is
/// a perfectly good identity).
fn pluck_directives(
    table: &mut toml::Table,
    fragment: &str,
    path: &str,
) -> Result<Directives, ArborError> {
    let take_str = |map: &mut toml::Table, name: &str| -> Result<Option<String>, ArborError> {
        match map.remove(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(ArborError::malformed(
                directive_context(fragment, path),
                format!("`{name}` must be a string"),
            )),
        }
    };
    let take_bool = |map: &mut toml::Table, name: &str| -> Result<bool, ArborError> {
        match map.remove(name) {
            None => Ok(false),
            Some(Value::Boolean(b)) => Ok(b),
            Some(_) => Err(ArborError::malformed(
                directive_context(fragment, path),
                format!("`{name}` must be a boolean"),
            )),
        }
    };

    let marked = MARKER_KEYS.iter().any(|key| table.contains_key(*key));
    Ok(Directives {
        from_env: take_str(table, "from_env")?,
        from_zk: take_str(table, "from_zk")?,
        incl: take_str(table, "incl")?,
        include_from_env: take_str(table, "include_from_env")?,
        default: if marked {
            match table.remove("default") {
                None => None,
                Some(value) => Some(scalar_to_string(&value).ok_or_else(|| {
                    ArborError::malformed(
                        directive_context(fragment, path),
                        "`default` must be a scalar",
                    )
                })?),
            }
        } else {
            None
        },
        optional: if marked {
            take_bool(table, "optional")?
        } else {
            false
        },
        replace: take_bool(table, "replace")?,
    })
}

/// Builds the marker described by a table's directives, enforcing the
/// one-marker-per-node rule.
fn build_marker(
    directives: &mut Directives,
    fragment: &str,
    path: &str,
) -> Result<Option<Marker>, ArborError> {
    let context = || directive_context(fragment, path);
    let mut kinds = Vec::new();
    if let Some(var) = directives.from_env.take() {
        kinds.push(MarkerKind::FromEnv {
            var,
            default: directives.default.take(),
        });
    }
    if let Some(store_path) = directives.from_zk.take() {
        kinds.push(MarkerKind::FromRemote { path: store_path });
    }
    if let Some(name) = directives.incl.take() {
        kinds.push(MarkerKind::Include { name });
    }
    if let Some(var) = directives.include_from_env.take() {
        kinds.push(MarkerKind::IncludeFromEnv { var });
    }

    if kinds.len() > 1 {
        return Err(ArborError::malformed(
            context(),
            "a node may carry at most one substitution marker",
        ));
    }
    if directives.default.is_some() {
        return Err(ArborError::malformed(
            context(),
            "`default` requires `from_env`",
        ));
    }
    let Some(kind) = kinds.pop() else {
        return Ok(None);
    };
    Ok(Some(Marker {
        kind,
        optional: directives.optional,
    }))
}

fn convert_table(
    name: String,
    mut table: toml::Table,
    fragment: &str,
    path: &str,
) -> Result<Node, ArborError> {
    let mut directives = pluck_directives(&mut table, fragment, path)?;
    let marker = build_marker(&mut directives, fragment, path)?;

    if marker.is_some() && !table.is_empty() {
        return Err(ArborError::malformed(
            directive_context(fragment, path),
            "a substitution marker cannot carry additional keys",
        ));
    }

    let mut node = Node::named(name);
    node.marker = marker;
    node.replace = directives.replace;
    for (key, value) in table {
        let child_path = path_join(path, &key);
        node.children
            .extend(convert_value(key, value, fragment, &child_path)?);
    }
    Ok(node)
}

/// Converts one table entry into sibling nodes.
///
/// Arrays expand into one sibling per element (the repeated-element idiom);
/// an empty array yields a single empty node so "present but empty" remains
/// observable after merging.
fn convert_value(
    key: String,
    value: Value,
    fragment: &str,
    path: &str,
) -> Result<Vec<Node>, ArborError> {
    match value {
        Value::Table(table) => Ok(vec![convert_table(key, table, fragment, path)?]),
        Value::Array(items) => {
            if items.is_empty() {
                return Ok(vec![Node::named(key)]);
            }
            let mut nodes = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Table(table) => {
                        nodes.push(convert_table(key.clone(), table, fragment, path)?);
                    }
                    Value::Array(_) => {
                        return Err(ArborError::malformed(
                            directive_context(fragment, path),
                            "nested arrays are not supported",
                        ));
                    }
                    scalar => {
                        let rendered = scalar_to_string(&scalar).ok_or_else(|| {
                            ArborError::malformed(
                                directive_context(fragment, path),
                                "array elements must be scalars or tables",
                            )
                        })?;
                        nodes.push(Node::leaf(key.clone(), rendered));
                    }
                }
            }
            Ok(nodes)
        }
        scalar => {
            let rendered = scalar_to_string(&scalar).ok_or_else(|| {
                ArborError::malformed(
                    directive_context(fragment, path),
                    "unsupported value type",
                )
            })?;
            Ok(vec![Node::leaf(key, rendered)])
        }
    }
}

/// Renders a scalar TOML value as the string form the resolver traffics in.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Datetime(d) => Some(d.to_string()),
        Value::Array(_) | Value::Table(_) => None,
    }
}
