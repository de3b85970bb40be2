use indexmap::IndexMap;

use super::*;
use crate::lock::LockedPackage;

struct Fixture {
    _home: tempfile::TempDir,
    store: GlobalStore,
    specifiers: SpecifierCache,
}

impl Fixture {
    fn new() -> Self {
        let home = tempfile::tempdir().unwrap();
        let store = GlobalStore::open(home.path()).unwrap();

        Fixture {
            _home: home,
            store,
            specifiers: SpecifierCache::new(),
        }
    }

    /// Publishes `name@version`, which was itself locked against `deps`.
    #[track_caller]
    fn publish(&mut self, name: &str, version: &str, deps: &[(&str, &str, bool)]) {
        let artifact = self
            .store
            .record_publish(
                &mut self.specifiers,
                name,
                version,
                Signature::new(format!("{name}{version}"), "m"),
            )
            .unwrap();

        let resolve = artifact.resolve.clone();
        std::fs::create_dir_all(&resolve).unwrap();

        if deps.is_empty() {
            return;
        }

        let mut pkgs = IndexMap::new();
        for (dep, range, traverse_imports) in deps {
            pkgs.insert(
                (*dep).to_string(),
                LockedPackage {
                    import: false,
                    signature: Signature::new("c", "m"),
                    traverse_imports: *traverse_imports,
                    version: (*range).to_string(),
                    version_resolve: String::new(),
                },
            );
        }

        LockFile {
            pkgs,
            ..LockFile::default()
        }
        .write(&resolve)
        .unwrap();
    }

    fn build(&mut self, roots: &[Declaration]) -> Result<Vec<TreeEntry>> {
        build_tree(&self.store, &mut self.specifiers, roots)
    }
}

fn summary(entries: &[TreeEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            format!(
                "{} import={} traverse={} lineage={}",
                entry.publish_name(),
                entry.import,
                entry.traverse_imports,
                entry.lineage.as_deref().unwrap_or("-")
            )
        })
        .collect()
}

#[test]
fn resolves_newest_compatible_version() {
    let mut fixture = Fixture::new();
    fixture.publish("libA", "1.0.0", &[]);
    fixture.publish("libA", "1.2.0", &[]);
    fixture.publish("libA", "2.0.0", &[]);

    let entries = fixture
        .build(&[Declaration::new("libA", "^1.0.0").imported(false)])
        .unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].version, "^1.0.0");
    assert_eq!(entries[0].version_resolve, "1.2.0");
    assert_eq!(entries[0].signature, Signature::new("libA1.2.0", "m"));
    assert!(entries[0].is_root());
    assert!(entries[0].publish_resolve.ends_with("packages/libA/1.2.0"));
}

#[test]
fn exact_version_without_range_match() {
    let mut fixture = Fixture::new();
    fixture.publish("libA", "1.0.0", &[]);

    let entries = fixture.build(&[Declaration::new("libA", "1.0.0")]).unwrap();

    assert_eq!(entries[0].version_resolve, "1.0.0");
}

#[test]
fn traverses_locked_dependencies() {
    let mut fixture = Fixture::new();
    fixture.publish("libC", "1.0.0", &[]);
    fixture.publish("libB", "1.0.0", &[("libC", "^1.0.0", false)]);
    fixture.publish("libA", "1.0.0", &[("libB", "^1.0.0", false)]);

    let entries = fixture.build(&[Declaration::new("libA", "^1.0.0")]).unwrap();

    insta::assert_debug_snapshot!(summary(&entries), @r#"
    [
        "libA@1.0.0 import=false traverse=false lineage=-",
        "libB@1.0.0 import=false traverse=false lineage=libA@1.0.0>>libB@1.0.0",
        "libC@1.0.0 import=false traverse=false lineage=libA@1.0.0>>libB@1.0.0>>libC@1.0.0",
    ]
    "#);
}

#[test]
fn traverse_imports_propagates_to_descendants() {
    let mut fixture = Fixture::new();
    fixture.publish("libC", "1.0.0", &[]);
    fixture.publish("libB", "1.0.0", &[("libC", "^1.0.0", false)]);
    fixture.publish("libA", "1.0.0", &[("libB", "^1.0.0", false)]);

    let entries = fixture
        .build(&[Declaration::new("libA", "^1.0.0").imported(true)])
        .unwrap();

    insta::assert_debug_snapshot!(summary(&entries), @r#"
    [
        "libA@1.0.0 import=true traverse=true lineage=-",
        "libB@1.0.0 import=true traverse=true lineage=libA@1.0.0>>libB@1.0.0",
        "libC@1.0.0 import=true traverse=true lineage=libA@1.0.0>>libB@1.0.0>>libC@1.0.0",
    ]
    "#);
}

#[test]
fn locked_traverse_imports_applies_below_the_entry() {
    let mut fixture = Fixture::new();
    fixture.publish("libC", "1.0.0", &[]);
    fixture.publish("libB", "1.0.0", &[("libC", "^1.0.0", false)]);
    fixture.publish("libA", "1.0.0", &[("libB", "^1.0.0", true)]);

    let entries = fixture.build(&[Declaration::new("libA", "^1.0.0")]).unwrap();

    insta::assert_debug_snapshot!(summary(&entries), @r#"
    [
        "libA@1.0.0 import=false traverse=false lineage=-",
        "libB@1.0.0 import=false traverse=true lineage=libA@1.0.0>>libB@1.0.0",
        "libC@1.0.0 import=true traverse=true lineage=libA@1.0.0>>libB@1.0.0>>libC@1.0.0",
    ]
    "#);
}

#[test]
fn shared_leaf_is_tracked_per_lineage() {
    let mut fixture = Fixture::new();
    fixture.publish("leaf", "1.0.0", &[]);
    fixture.publish("libA", "1.0.0", &[("leaf", "^1.0.0", false)]);
    fixture.publish("libB", "1.0.0", &[("leaf", "^1.0.0", false)]);

    let entries = fixture
        .build(&[Declaration::new("libA", "^1.0.0"), Declaration::new("libB", "^1.0.0")])
        .unwrap();

    let lineages = entries.iter().filter_map(|entry| entry.lineage.as_deref()).collect::<Vec<_>>();

    assert_eq!(lineages, ["libA@1.0.0>>leaf@1.0.0", "libB@1.0.0>>leaf@1.0.0"]);
}

#[test]
fn cycles_are_rejected() {
    let mut fixture = Fixture::new();
    fixture.publish("libA", "1.0.0", &[("libB", "^1.0.0", false)]);
    fixture.publish("libB", "1.0.0", &[("libA", "^1.0.0", false)]);

    let err = fixture.build(&[Declaration::new("libA", "^1.0.0")]).unwrap_err();

    assert!(err.message().contains("libA@1.0.0>>libB@1.0.0>>libA@1.0.0"));
}

#[test]
fn missing_compatible_version_fails() {
    let mut fixture = Fixture::new();
    fixture.publish("libA", "1.0.0", &[]);

    assert!(fixture.build(&[Declaration::new("libA", "^2.0.0")]).is_err());
    assert!(fixture.build(&[Declaration::new("libZ", "^1.0.0")]).is_err());
}

#[test]
fn scoped_packages_resolve() {
    let mut fixture = Fixture::new();
    fixture.publish("@org/lib", "0.3.1", &[]);

    let entries = fixture.build(&[Declaration::new("@org/lib", "~0.3.0")]).unwrap();

    assert_eq!(entries[0].publish_name(), "@org/lib@0.3.1");
}
