//! Fragment parsing and store behaviour.

use anyhow::Result;
use camino::{Utf8Path, Utf8PathBuf};
use rstest::rstest;

use super::{DirSource, FragmentSource, StaticSource, parse_fragment};
use crate::error::ArborError;
use crate::tree::{MarkerKind, Node};

fn child<'a>(node: &'a Node, name: &str) -> &'a Node {
    node.child(name)
        .unwrap_or_else(|| panic!("missing child '{name}'"))
}

#[test]
fn scalars_are_stringified_on_load() -> Result<()> {
    let fragment = parse_fragment(
        "000-base.toml",
        "max_query_size = 33333\nreadonly = false\nratio = 0.5\n",
    )?;
    let root = &fragment.root;
    assert_eq!(child(root, "max_query_size").value.as_deref(), Some("33333"));
    assert_eq!(child(root, "readonly").value.as_deref(), Some("false"));
    assert_eq!(child(root, "ratio").value.as_deref(), Some("0.5"));
    Ok(())
}

#[test]
fn markers_parse_with_default_and_optional() -> Result<()> {
    let fragment = parse_fragment(
        "markers.toml",
        concat!(
            "[settings]\n",
            "max_query_size = { from_env = \"MAX_QUERY_SIZE\", default = 262144 }\n",
            "banner = { from_zk = \"/config/banner\", optional = true }\n",
            "users = { incl = \"shared_users\" }\n",
            "extra = { include_from_env = \"EXTRA_CONFIG\" }\n",
        ),
    )?;
    let settings = child(&fragment.root, "settings");

    let size = child(settings, "max_query_size");
    let marker = size.marker.as_ref().map(|m| &m.kind);
    assert_eq!(
        marker,
        Some(&MarkerKind::FromEnv {
            var: "MAX_QUERY_SIZE".to_owned(),
            default: Some("262144".to_owned()),
        })
    );

    let banner = child(settings, "banner");
    assert!(banner.marker.as_ref().is_some_and(|m| m.optional));
    assert_eq!(
        banner.marker.as_ref().map(|m| &m.kind),
        Some(&MarkerKind::FromRemote {
            path: "/config/banner".to_owned()
        })
    );

    assert_eq!(
        child(settings, "users").marker.as_ref().map(|m| &m.kind),
        Some(&MarkerKind::Include {
            name: "shared_users".to_owned()
        })
    );
    assert_eq!(
        child(settings, "extra").marker.as_ref().map(|m| &m.kind),
        Some(&MarkerKind::IncludeFromEnv {
            var: "EXTRA_CONFIG".to_owned()
        })
    );
    Ok(())
}

#[test]
fn replace_directive_is_carried_on_the_node() -> Result<()> {
    let fragment = parse_fragment("r.toml", "[users]\nreplace = true\n[users.alice]\n")?;
    assert!(child(&fragment.root, "users").replace);
    Ok(())
}

#[rstest]
#[case::marker_with_body("[a]\nfrom_env = \"V\"\nextra = 1\n", "additional keys")]
#[case::two_markers("[a]\nfrom_env = \"V\"\nincl = \"b\"\n", "at most one")]
#[case::default_with_wrong_marker("[a]\nfrom_zk = \"/p\"\ndefault = \"x\"\n", "requires `from_env`")]
#[case::nested_array("a = [[1, 2]]\n", "nested arrays")]
#[case::marker_wrong_type("[a]\nfrom_env = 5\n", "must be a string")]
fn structural_rules_are_rejected(#[case] text: &str, #[case] needle: &str) {
    let err = match parse_fragment("bad.toml", text) {
        Err(err) => err,
        Ok(_) => panic!("fragment should be rejected"),
    };
    assert!(matches!(err, ArborError::Malformed { .. }), "{err}");
    assert!(err.to_string().contains(needle), "{err}");
}

#[test]
fn directive_names_stay_ordinary_outside_marker_tables() -> Result<()> {
    let fragment = parse_fragment(
        "profiles.toml",
        "[users.default]\nprofile = \"default\"\noptional = true\n",
    )?;
    let default_user = child(child(&fragment.root, "users"), "default");
    assert!(default_user.marker.is_none());
    assert_eq!(
        default_user.child("optional").and_then(|n| n.value.as_deref()),
        Some("true")
    );
    Ok(())
}

#[test]
fn invalid_toml_is_a_load_error() {
    let err = match parse_fragment("broken.toml", "not = = toml") {
        Err(err) => err,
        Ok(_) => panic!("document should not parse"),
    };
    assert!(matches!(err, ArborError::Load { .. }), "{err}");
}

#[test]
fn arrays_expand_into_siblings() -> Result<()> {
    let fragment = parse_fragment(
        "arrays.toml",
        "allow_databases = [\"db1\", \"db2\"]\nempty = []\n",
    )?;
    let names: Vec<_> = fragment
        .root
        .children_named("allow_databases")
        .filter_map(|n| n.value.as_deref())
        .collect();
    assert_eq!(names, ["db1", "db2"]);

    // The empty array stays observable as a childless, valueless node.
    let empty = child(&fragment.root, "empty");
    assert!(empty.value.is_none());
    assert!(empty.children.is_empty());
    Ok(())
}

#[test]
fn array_of_tables_expands_into_siblings() -> Result<()> {
    let fragment = parse_fragment(
        "shards.toml",
        "[[cluster.shard]]\nhost = \"a\"\n[[cluster.shard]]\nhost = \"b\"\n",
    )?;
    let cluster = child(&fragment.root, "cluster");
    let hosts: Vec<_> = cluster
        .children_named("shard")
        .filter_map(|s| s.child("host").and_then(|h| h.value.as_deref()))
        .collect();
    assert_eq!(hosts, ["a", "b"]);
    Ok(())
}

#[test]
fn dir_source_orders_by_file_name() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("010-override.toml"), "x = 2\n")?;
    std::fs::write(dir.path().join("000-base.toml"), "x = 1\n")?;
    std::fs::write(dir.path().join("README.txt"), "not a fragment\n")?;

    let dir_path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf())
        .map_err(|p| anyhow::anyhow!("non-UTF-8 temp dir: {}", p.display()))?;
    let fragments = DirSource::new(dir_path).load()?;
    let keys: Vec<_> = fragments.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(keys, ["000-base.toml", "010-override.toml"]);
    Ok(())
}

#[test]
fn static_source_sorts_by_key_and_serves_files() -> Result<()> {
    let source = StaticSource::new()
        .with_fragment("010-later", "x = 2\n")?
        .with_fragment("000-early", "x = 1\n")?
        .with_file("/etc/app/extra.toml", "y = 3\n");

    let keys: Vec<_> = source.load()?.into_iter().map(|f| f.key).collect();
    assert_eq!(keys, ["000-early", "010-later"]);

    let extra = source.load_path(Utf8Path::new("/etc/app/extra.toml"))?;
    assert_eq!(
        extra.root.child("y").and_then(|n| n.value.as_deref()),
        Some("3")
    );

    let missing = source.load_path(Utf8Path::new("/etc/app/absent.toml"));
    assert!(matches!(missing, Err(ArborError::Load { .. })));
    Ok(())
}
