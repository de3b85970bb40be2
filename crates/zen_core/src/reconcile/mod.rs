//! Reconciliation of a dependency tree against the previous lock state of a
//! project.
//!
//! The lock file of the project records the signature of every dependency as
//! of the last run. Comparing those against the freshly built tree decides,
//! per entry, whether the package manager has to run again (the manifest of
//! the dependency changed), whether copying the new contents in place is
//! enough (only the contents changed), or whether nothing has to happen at
//! all. Afterwards the lock file is rebuilt from scratch.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use zen_errors::Result;

use crate::lock::{LockFile, LockedPackage};
use crate::manifest::{FILE_PREFIX, Manifest};
use crate::pack::Packer;
use crate::store::GlobalStore;
use crate::tree::{LINEAGE_SEPARATOR, TreeEntry};

/// Directory within a project which holds imported dependencies.
pub const IMPORT_DIR: &str = ".zen";

/// Directory within a project which holds installed dependencies.
pub const DEPENDENCY_DIR: &str = "node_modules";

/// Path which a root dependency should be declared with in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub name: String,
    pub path: String,
}

/// A root dependency which is no longer declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedPackage {
    pub name: String,
    pub version_resolve: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Paths of every root dependency, or nothing if the project was already up
    /// to date.
    pub resolved: Vec<ResolvedPath>,

    /// Paths of every root dependency, even if the project was up to date.
    pub root_paths: Vec<ResolvedPath>,

    pub removed: Vec<RemovedPackage>,

    /// Publishable names which require the package manager to run.
    pub installs: Vec<String>,

    /// Publishable names whose contents were copied into place.
    pub injections: Vec<String>,

    /// Changes made to the import directory.
    pub import_changes: Vec<String>,

    /// Changes made to the lock file.
    pub lock_changes: Vec<String>,
}

impl Reconciliation {
    /// Determines whether the project was already up to date.
    pub fn is_noop(&self) -> bool {
        self.installs.is_empty() && self.injections.is_empty() && self.removed.is_empty()
    }
}

/// Gets the directory name of an imported dependency, relative to the import
/// directory.
pub fn import_name(name: &str, version_resolve: &str) -> String {
    format!("{name}@{version_resolve}")
}

/// Reconciles the dependency tree against the lock file of the project in the
/// directory of `manifest`.
///
/// Removed root dependencies are deleted from the dependency scopes of
/// `manifest`, but the manifest itself is not written.
///
/// # Errors
///
/// Returns `Err` if the previous lock file is malformed, or if dependencies
/// could not be copied into the project. Changes made before the failing step
/// are not rolled back.
#[tracing::instrument(level = "DEBUG", skip_all, fields(cwd = %manifest.dir().display()), err)]
pub fn reconcile(
    store: &mut GlobalStore,
    packer: &dyn Packer,
    tree: &[TreeEntry],
    manifest: &mut Manifest,
) -> Result<Reconciliation> {
    let cwd = manifest.dir().to_path_buf();
    let import_root = cwd.join(IMPORT_DIR);

    let previous = LockFile::read_or_default(&cwd)?;
    let mut lock = LockFile::default();
    let mut root_paths = Vec::new();

    let removed = previous
        .pkgs
        .iter()
        .filter(|(name, locked)| {
            !tree
                .iter()
                .any(|entry| entry.is_root() && &entry.name == *name && entry.version == locked.version)
        })
        .map(|(name, locked)| RemovedPackage {
            name: name.clone(),
            version_resolve: locked.version_resolve.clone(),
        })
        .collect::<Vec<_>>();

    let mut installs: IndexMap<&str, &TreeEntry> = IndexMap::new();
    let mut injections: IndexMap<&str, &TreeEntry> = IndexMap::new();

    // Traversed entries which changed, whose importing parents must point at
    // them again.
    let mut changed_children = Vec::new();

    for entry in tree {
        let present = expected_path(&cwd, entry).exists();

        match &entry.lineage {
            None => {
                let prior = previous.pkgs.get(&entry.name);

                match prior {
                    Some(prior) if prior.signature.same_manifest(&entry.signature) => {
                        let flags_changed =
                            prior.import != entry.import || prior.traverse_imports != entry.traverse_imports;

                        if !prior.signature.same_content(&entry.signature) || flags_changed || !present {
                            mark(&mut injections, entry);
                        }
                    }
                    _ => mark(&mut installs, entry),
                }

                lock.pkgs.insert(
                    entry.name.clone(),
                    LockedPackage {
                        import: entry.import,
                        signature: entry.signature.clone(),
                        traverse_imports: entry.traverse_imports,
                        version: entry.version.clone(),
                        version_resolve: entry.version_resolve.clone(),
                    },
                );

                root_paths.push(ResolvedPath {
                    name: entry.name.clone(),
                    path: if entry.import {
                        format!("{IMPORT_DIR}/{}", import_name(&entry.name, &entry.version_resolve))
                    } else {
                        entry.publish_resolve.to_string_lossy().into_owned()
                    },
                });
            }
            Some(lineage) => {
                let target = match previous.tree.get(lineage) {
                    Some(prior) if prior.same_manifest(&entry.signature) => {
                        (!prior.same_content(&entry.signature) || !present).then_some(&mut injections)
                    }
                    _ => Some(&mut installs),
                };

                if let Some(list) = target {
                    mark(list, entry);
                    changed_children.push(entry);
                }

                lock.tree.insert(lineage.clone(), entry.signature.clone());
            }
        }
    }

    injections.retain(|name, _| !installs.contains_key(name));

    let mut import_changes = prune_import_dir(&import_root, tree);
    let mut materialized = Vec::new();

    for entry in injections.values().chain(installs.values()).filter(|entry| entry.import) {
        let name = import_name(&entry.name, &entry.version_resolve);
        let destination = import_root.join(&name);

        if destination.exists() {
            import_changes.push(format!("Updated {name}."));
            crate::fs::remove(&destination)?;
        } else {
            import_changes.push(format!("Added {name}."));
        }

        packer.materialize(&entry.publish_resolve, &destination)?;

        if relinks(entry) {
            relink_imports(&destination, &name, &children_of(tree, entry))?;
        }

        materialized.push(name);
    }

    for parent in parents_of(tree, &changed_children) {
        let name = import_name(&parent.name, &parent.version_resolve);
        let destination = import_root.join(&name);

        if materialized.contains(&name) || !destination.is_dir() {
            continue;
        }

        relink_imports(&destination, &name, &children_of(tree, parent))?;
        import_changes.push(format!("Relinked {name}."));
        materialized.push(name);
    }

    for entry in injections.values().filter(|entry| !entry.import) {
        let destination = cwd.join(DEPENDENCY_DIR).join(&entry.name);

        packer.materialize(&entry.publish_resolve, &destination)?;
    }

    let mut lock_changes = Vec::new();

    if !installs.is_empty() {
        for entry in installs.values().filter(|entry| entry.is_root()) {
            if !store.add_installation(&entry.publish_name(), &cwd) {
                tracing::warn!(
                    "could not record installation of {}, since it is not published",
                    entry.publish_name()
                );
            }
        }

        lock_changes.push(format!("Added: {}", publish_names(&installs)));
    }

    if !injections.is_empty() {
        lock_changes.push(format!("Injected: {}", publish_names(&injections)));
    }

    if !removed.is_empty() {
        for item in &removed {
            manifest.remove_dependency_everywhere(&item.name);

            let still_root = tree.iter().any(|entry| {
                entry.is_root() && entry.name == item.name && entry.version_resolve == item.version_resolve
            });

            let publish_name = import_name(&item.name, &item.version_resolve);
            if !still_root && !store.remove_installation(&publish_name, &cwd) {
                tracing::warn!("could not remove installation of {publish_name}, since it is not published");
            }
        }

        lock_changes.push(format!(
            "Removed: {}",
            removed
                .iter()
                .map(|item| import_name(&item.name, &item.version_resolve))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    lock.write(&cwd)?;
    store.save()?;

    let mut reconciliation = Reconciliation {
        resolved: root_paths.clone(),
        root_paths,
        removed,
        installs: installs.values().map(|entry| entry.publish_name()).collect(),
        injections: injections.values().map(|entry| entry.publish_name()).collect(),
        import_changes,
        lock_changes,
    };

    if reconciliation.is_noop() {
        tracing::debug!("dependencies are up to date");
        reconciliation.resolved.clear();
    }

    Ok(reconciliation)
}

/// Adds the entry to the list, replacing any earlier entry of the same name.
fn mark<'a>(list: &mut IndexMap<&'a str, &'a TreeEntry>, entry: &'a TreeEntry) {
    list.shift_remove(entry.name.as_str());
    list.insert(entry.name.as_str(), entry);
}

/// Gets the path an entry is expected to be placed at within the project.
fn expected_path(cwd: &Path, entry: &TreeEntry) -> PathBuf {
    if entry.import {
        cwd.join(IMPORT_DIR)
            .join(import_name(&entry.name, &entry.version_resolve))
    } else {
        cwd.join(DEPENDENCY_DIR).join(&entry.name)
    }
}

fn publish_names(list: &IndexMap<&str, &TreeEntry>) -> String {
    list.values()
        .map(|entry| entry.publish_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Removes every child of the import directory which no imported entry of the
/// tree refers to, returning a log of the removals.
///
/// Failures are reported as warnings.
fn prune_import_dir(import_root: &Path, tree: &[TreeEntry]) -> Vec<String> {
    let mut changes = Vec::new();

    if !import_root.is_dir() {
        return changes;
    }

    let wanted = tree
        .iter()
        .filter(|entry| entry.import)
        .map(|entry| import_name(&entry.name, &entry.version_resolve))
        .collect::<Vec<_>>();

    let is_wanted = |name: &str| wanted.iter().any(|wanted| wanted == name);

    for child in list_or_warn(import_root) {
        if child.starts_with('@') {
            let scope_dir = import_root.join(&child);

            for nested in list_or_warn(&scope_dir) {
                let name = format!("{child}/{nested}");

                if !is_wanted(&name) {
                    remove_or_warn(&scope_dir.join(&nested), &name, &mut changes);
                }
            }

            if list_or_warn(&scope_dir).is_empty() {
                remove_or_warn(&scope_dir, &child, &mut changes);
            }
        } else if !is_wanted(&child) {
            remove_or_warn(&import_root.join(&child), &child, &mut changes);
        }
    }

    if list_or_warn(import_root).is_empty()
        && let Err(err) = crate::fs::remove(import_root)
    {
        tracing::warn!("could not remove {}: {}", import_root.display(), err.message());
    }

    changes
}

fn list_or_warn(dir: &Path) -> Vec<String> {
    crate::fs::entry_names(dir).unwrap_or_else(|err| {
        tracing::warn!("could not read {}: {}", dir.display(), err.message());
        Vec::new()
    })
}

fn remove_or_warn(path: &Path, name: &str, changes: &mut Vec<String>) {
    match crate::fs::remove(path) {
        Ok(()) => changes.push(format!("Removed {name}")),
        Err(err) => tracing::warn!("could not remove {}: {}", path.display(), err.message()),
    }
}

/// Determines whether the zen dependencies of an imported entry are imported
/// alongside it, and so must be relinked once it is copied.
fn relinks(entry: &TreeEntry) -> bool {
    entry.import && (entry.traverse_imports || entry.lineage.is_some())
}

/// Gets the prefix which the lineage of every child of `entry` starts with.
fn child_prefix(entry: &TreeEntry) -> String {
    entry.lineage.clone().unwrap_or_else(|| entry.publish_name())
}

/// Gets the versions which the direct children of `entry` resolved to within
/// the tree, keyed by name.
fn children_of<'a>(tree: &'a [TreeEntry], entry: &TreeEntry) -> IndexMap<&'a str, &'a str> {
    let prefix = child_prefix(entry);

    tree.iter()
        .filter(|child| {
            child
                .lineage
                .as_deref()
                .and_then(|lineage| lineage.rsplit_once(LINEAGE_SEPARATOR))
                .is_some_and(|(parent, _)| parent == prefix)
        })
        .map(|child| (child.name.as_str(), child.version_resolve.as_str()))
        .collect()
}

/// Gets every relinking entry of the tree which is the direct parent of one of
/// the given imported children.
fn parents_of<'a>(tree: &'a [TreeEntry], children: &[&TreeEntry]) -> Vec<&'a TreeEntry> {
    let prefixes = children
        .iter()
        .filter(|child| child.import)
        .filter_map(|child| child.lineage.as_deref()?.rsplit_once(LINEAGE_SEPARATOR))
        .map(|(parent, _)| parent)
        .collect::<Vec<_>>();

    tree.iter()
        .filter(|entry| relinks(entry) && prefixes.contains(&child_prefix(entry).as_str()))
        .collect()
}

/// Points the zen dependencies of an imported package at their siblings within
/// the import directory, since relative paths of the published package no
/// longer hold once it is copied there.
///
/// Every dependency points at the version it resolved to within the current
/// tree, which may be newer than the one the package was published with.
fn relink_imports(destination: &Path, name: &str, children: &IndexMap<&str, &str>) -> Result<()> {
    if children.is_empty() {
        return Ok(());
    }

    let mut manifest = match Manifest::read(destination) {
        Ok(manifest) => manifest,
        Err(err) => {
            tracing::warn!("could not relink imports of {name}: {}", err.message());
            return Ok(());
        }
    };

    let zen = manifest.zen()?;
    let parent = "../".repeat(Path::new(name).components().count());

    for (scope, dependency, _) in zen.declarations() {
        if !manifest.has_scope(scope) {
            tracing::warn!("{name} has no {scope} block, so the import of {dependency} was not relinked");
            continue;
        }

        let Some(version_resolve) = children.get(dependency.as_str()) else {
            tracing::warn!("{name} declares {dependency}, but it was not resolved as one of its dependencies");
            continue;
        };

        let path = format!("{FILE_PREFIX}{parent}{}", import_name(dependency, version_resolve));

        manifest.set_dependency(scope, dependency, &path);
    }

    manifest.write()?;

    Ok(())
}
