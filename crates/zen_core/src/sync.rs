//! Synchronization of a project with the dependencies it declares.

use std::collections::HashMap;
use std::path::PathBuf;

use zen_errors::{Result, SimpleDiagnostic};

use crate::errors::NoCompatibleVersion;
use crate::lock::{LOCK_FILE_NAME, LockFile};
use crate::manifest::{DependencyScope, FILE_PREFIX, GitConfig, Manifest, ZenDependency};
use crate::reconcile::{IMPORT_DIR, Reconciliation, reconcile};
use crate::scripts::LifecycleEvent;
use crate::session::Session;
use crate::tree::{Declaration, build_tree};

/// Outcome of synchronizing a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub reconciliation: Reconciliation,

    /// Root dependencies whose declared path in the manifest changed.
    pub changed: Vec<String>,
}

/// Synchronizes the project of `manifest` with the dependencies declared in
/// its zen configuration block.
///
/// The dependency tree is rebuilt and reconciled against the lock file, after
/// which every root dependency is declared in its dependency scope with the
/// path it resolved to. Lifecycle scripts of the project run afterwards,
/// depending on what changed.
///
/// # Errors
///
/// Returns `Err` if the tree could not be built or reconciled, if the manifest
/// could not be written, or if a lifecycle script failed.
#[tracing::instrument(level = "DEBUG", skip_all, fields(cwd = %manifest.dir().display()), err)]
pub fn sync_project(session: &mut Session, manifest: &mut Manifest) -> Result<SyncReport> {
    let zen = manifest.zen()?;
    let cwd = manifest.dir().to_path_buf();
    let git = zen.git.as_ref();

    let mut scopes = HashMap::new();
    let mut roots = Vec::new();

    for (scope, name, dependency) in zen.declarations() {
        scopes.insert(name.clone(), scope);
        roots.push(Declaration::from_zen(name, dependency));
    }

    let tree = build_tree(&session.store, &mut session.specifiers, &roots)?;
    let reconciliation = reconcile(&mut session.store, session.packer.as_ref(), &tree, manifest)?;

    commit_or_warn(session, &[cwd.join(IMPORT_DIR)], &reconciliation.import_changes, git, &cwd);
    commit_or_warn(session, &[cwd.join(LOCK_FILE_NAME)], &reconciliation.lock_changes, git, &cwd);

    let mut changed = Vec::new();

    for resolved in &reconciliation.root_paths {
        let scope = scopes
            .get(&resolved.name)
            .copied()
            .unwrap_or(DependencyScope::Dependencies);

        let path = format!("{FILE_PREFIX}{}", resolved.path);

        if manifest.set_dependency(scope, &resolved.name, &path) {
            changed.push(resolved.name.clone());
        }
    }

    manifest.write()?;

    if !changed.is_empty() && git.is_some_and(|git| git.package_commits == Some(true)) {
        let message = format!("Added {}", changed.join(","));
        commit_or_warn(session, &[manifest.path()], &[message], git, &cwd);
    }

    let removed = !reconciliation.removed.is_empty();

    if !changed.is_empty() {
        session.scripts.run(LifecycleEvent::PostAdd, &cwd)?;
    }

    if removed {
        session.scripts.run(LifecycleEvent::PostRemove, &cwd)?;
    }

    if removed || !changed.is_empty() {
        session.scripts.run(LifecycleEvent::PostUpdate, &cwd)?;
    }

    Ok(SyncReport {
        reconciliation,
        changed,
    })
}

fn commit_or_warn(
    session: &Session,
    files: &[PathBuf],
    changes: &[String],
    git: Option<&GitConfig>,
    cwd: &std::path::Path,
) {
    if changes.is_empty() {
        return;
    }

    if let Err(err) = session.committer.commit(files, &changes.join("\n"), git, cwd) {
        tracing::warn!("could not commit changes to git: {}", err.message());
    }
}

/// Options for adding dependencies to a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOptions {
    pub scope: DependencyScope,
    pub import: bool,
    pub traverse_imports: bool,
}

impl Default for AddOptions {
    fn default() -> Self {
        AddOptions {
            scope: DependencyScope::Dependencies,
            import: false,
            traverse_imports: false,
        }
    }
}

/// Declares the given packages as zen dependencies of the project, then
/// synchronizes it.
///
/// Packages without a version, or with `latest`, are declared with a caret
/// range of their newest published version. A package which was declared in
/// another scope before is moved into the requested one.
///
/// # Errors
///
/// Returns `Err` if any specifier is invalid, if a package was never
/// published, or if the project could not be synchronized.
pub fn add_packages(
    session: &mut Session,
    manifest: &mut Manifest,
    packages: &[String],
    options: AddOptions,
) -> Result<SyncReport> {
    let mut zen = manifest.zen()?;

    for package in packages {
        let specifier = session.specifiers.parse(package)?;

        let version = match specifier.version.as_deref() {
            None | Some("latest") => {
                let newest = session.store.compatible_versions(&specifier.full_name, None)?;

                let Some(newest) = newest.into_iter().next() else {
                    return Err(NoCompatibleVersion {
                        name: specifier.full_name.clone(),
                        range: String::from("*"),
                    }
                    .into());
                };

                let symbol = specifier.range_symbol.map_or('^', |symbol| symbol.as_char());

                format!("{symbol}{newest}")
            }
            Some(_) => specifier
                .version_with_symbol
                .clone()
                .unwrap_or_else(|| String::from("*")),
        };

        for scope in DependencyScope::ALL {
            if scope != options.scope && zen.scope_mut(scope).shift_remove(&specifier.full_name).is_some() {
                tracing::debug!("moving {} out of {scope}", specifier.full_name);
                manifest.remove_dependency(scope, &specifier.full_name);
            }
        }

        zen.scope_mut(options.scope).insert(
            specifier.full_name.clone(),
            ZenDependency {
                import: Some(options.import),
                traverse_imports: Some(options.traverse_imports),
                version,
            },
        );
    }

    manifest.set_zen(&zen)?;

    sync_project(session, manifest)
}

/// Removes the given packages from every dependency scope of the project,
/// then synchronizes it.
///
/// # Errors
///
/// Returns `Err` if any specifier is invalid, or if the project could not be
/// synchronized.
pub fn remove_packages(session: &mut Session, manifest: &mut Manifest, packages: &[String]) -> Result<SyncReport> {
    let mut zen = manifest.zen()?;

    for package in packages {
        let specifier = session.specifiers.parse(package)?;

        if !zen.remove_everywhere(&specifier.full_name) {
            tracing::warn!("{} is not a zen dependency", specifier.full_name);
        }

        manifest.remove_dependency_everywhere(&specifier.full_name);
    }

    manifest.set_zen(&zen)?;

    sync_project(session, manifest)
}

/// Replaces the local paths of every zen dependency in the manifest with
/// their declared versions, so the package can be published to a registry.
///
/// With `exact`, the version each dependency resolved to is used instead of
/// the declared range. Returns every replacement that was made.
///
/// # Errors
///
/// Returns `Err` if the lock file could not be read for `exact`, or if the
/// manifest could not be written.
pub fn stage_production(session: &Session, manifest: &mut Manifest, exact: bool) -> Result<Vec<String>> {
    let zen = manifest.zen()?;
    let cwd = manifest.dir().to_path_buf();

    let lock = if exact { Some(LockFile::read(&cwd)?) } else { None };

    let mut converted = Vec::new();

    for scope in DependencyScope::ALL {
        let declared = zen.scope(scope);
        if declared.is_empty() {
            continue;
        }

        if !manifest.has_scope(scope) {
            tracing::warn!("{scope} is declared in the zen block, but missing from the manifest");
            continue;
        }

        for (name, dependency) in declared {
            let version = match &lock {
                Some(lock) => match lock.pkgs.get(name) {
                    Some(locked) => locked.version_resolve.clone(),
                    None => {
                        return Err(SimpleDiagnostic::new(format!("could not resolve version for `{name}`"))
                            .with_help("run `zen pull` to lock every declared dependency")
                            .into());
                    }
                },
                None => dependency.version.clone(),
            };

            if manifest.set_dependency(scope, name, &version) {
                converted.push(format!("{scope}.{name} -> {version}"));
            }
        }
    }

    if manifest.write()? {
        commit_or_warn(
            session,
            &[manifest.path()],
            &[String::from("Staged for production")],
            zen.git.as_ref(),
            &cwd,
        );
    }

    Ok(converted)
}
