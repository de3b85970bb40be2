//! Publishing of packages into the global store, and everything which acts on
//! published packages as a whole.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use zen_errors::Result;

use crate::errors::*;
use crate::lock::{LOCK_FILE_NAME, LockFile};
use crate::manifest::{MANIFEST_FILE_NAME, Manifest};
use crate::pack::PackOutput;
use crate::scripts::LifecycleEvent;
use crate::session::Session;
use crate::signature::{Signature, file_digest};
use crate::sync::{SyncReport, sync_project};

/// Packs the package in `dir` into `out`, surrounded by its `prepack` and
/// `postpack` scripts.
///
/// # Errors
///
/// Returns `Err` if a script failed or if the package could not be packed.
pub fn pack_package(session: &Session, dir: &Path, out: &Path) -> Result<PackOutput> {
    session.scripts.run(LifecycleEvent::PrePack, dir)?;

    let output = session.packer.pack(dir, out)?;

    session.scripts.run(LifecycleEvent::PostPack, out)?;

    Ok(output)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub publish_name: String,
    pub signature: Signature,

    /// Directory which the artifact was published into.
    pub path: PathBuf,

    pub pack: PackOutput,
}

/// Publishes the package in `cwd` into the global store.
///
/// Publishing the same version again replaces the artifact, but keeps the
/// installations which were recorded for it.
///
/// # Errors
///
/// Returns `Err` if the manifest lacks a name or version, if the package could
/// not be packed, or if the store could not be written.
#[tracing::instrument(level = "DEBUG", skip(session), err)]
pub fn publish(session: &mut Session, cwd: &Path) -> Result<Published> {
    let manifest = Manifest::read_requiring(cwd, &["name", "version"])?;
    let name = manifest.require("name")?;
    let version = manifest.require("version")?;

    let publish_name = session.specifiers.publishable_name(name, version)?;
    let out = session
        .store
        .artifact_dir(&session.specifiers.parse(&publish_name)?);

    let pack = pack_package(session, cwd, &out)?;

    // The manifest is hashed after packing, since `prepack` may change it.
    let manifest_digest = file_digest(&cwd.join(MANIFEST_FILE_NAME))?;
    let signature = Signature::from_digests(pack.content_hash.clone(), &manifest_digest);

    let path = session
        .store
        .record_publish(&mut session.specifiers, name, version, signature.clone())?
        .resolve
        .clone();

    session.store.save()?;

    let lock = cwd.join(LOCK_FILE_NAME);
    let target = path.join(LOCK_FILE_NAME);

    if lock.is_file()
        && !target.exists()
        && let Err(err) = crate::fs::copy(&lock, &target)
    {
        tracing::warn!("could not copy {LOCK_FILE_NAME} into {}: {}", path.display(), err.message());
    }

    tracing::info!("published {publish_name} ({signature})");

    Ok(Published {
        publish_name,
        signature,
        path,
        pack,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unpublished {
    pub publish_name: String,

    /// Projects which still had the package installed.
    pub installations: Vec<String>,
}

/// Removes the published version of the package in `cwd` from the global
/// store, along with its artifact.
///
/// # Errors
///
/// Returns `Err` if the package is not published, or if it is still installed
/// in any project and `force` is not set.
#[tracing::instrument(level = "DEBUG", skip(session), err)]
pub fn unpublish(session: &mut Session, cwd: &Path, force: bool) -> Result<Unpublished> {
    let manifest = Manifest::read_requiring(cwd, &["name", "version"])?;
    let name = manifest.require("name")?;
    let version = manifest.require("version")?;

    let publish_name = session.specifiers.publishable_name(name, version)?;

    let Some(artifact) = session.store.get(&publish_name) else {
        return Err(PackageNotPublished { name: publish_name }.into());
    };

    let installations = artifact
        .installations
        .iter()
        .map(|installation| installation.path.clone())
        .collect::<Vec<_>>();

    if !installations.is_empty() && !force {
        return Err(PackageInstalled {
            name: publish_name,
            count: installations.len(),
        }
        .into());
    }

    let removed = session.store.unpublish(&mut session.specifiers, name, version)?;
    session.store.save()?;

    if let Some(artifact) = removed
        && let Err(err) = crate::fs::remove(&artifact.resolve)
    {
        tracing::warn!(
            "could not remove {}, it must be removed manually: {}",
            artifact.resolve.display(),
            err.message()
        );
    }

    Ok(Unpublished {
        publish_name,
        installations,
    })
}

/// Outcome of pushing into a single project.
#[derive(Debug)]
pub struct PushOutcome {
    pub dir: PathBuf,
    pub result: Result<SyncReport>,
}

/// Synchronizes every project which has the package in `cwd` installed, along
/// with every project which has one of those installed, and so on.
///
/// A failure within one project does not stop the others from being
/// synchronized.
///
/// # Errors
///
/// Returns `Err` if the package in `cwd` is not published.
#[tracing::instrument(level = "DEBUG", skip(session), err)]
pub fn push(session: &mut Session, cwd: &Path) -> Result<Vec<PushOutcome>> {
    let manifest = Manifest::read_requiring(cwd, &["name", "version"])?;
    let publish_name = session
        .specifiers
        .publishable_name(manifest.require("name")?, manifest.require("version")?)?;

    if session.store.get(&publish_name).is_none() {
        return Err(PackageNotPublished { name: publish_name }.into());
    }

    let mut visited = HashSet::new();
    let mut projects = Vec::new();
    let mut pending = vec![publish_name];

    while let Some(publish_name) = pending.pop() {
        let Some(artifact) = session.store.get(&publish_name) else {
            continue;
        };

        for installation in &artifact.installations {
            let dir = PathBuf::from(&installation.path);

            if !visited.insert(dir.clone()) || !dir.join(MANIFEST_FILE_NAME).is_file() {
                continue;
            }

            match Manifest::read(&dir) {
                Ok(manifest) => {
                    if let (Some(name), Some(version)) = (manifest.name(), manifest.version()) {
                        pending.push(session.specifiers.publishable_name(name, version)?);
                    }
                }
                Err(err) => tracing::warn!("skipping {}: {}", dir.display(), err.message()),
            }

            projects.push(dir);
        }
    }

    let mut outcomes = Vec::with_capacity(projects.len());

    for dir in projects {
        tracing::debug!("pushing into {}", dir.display());

        let result = Manifest::read(&dir).and_then(|mut manifest| sync_project(session, &mut manifest));

        outcomes.push(PushOutcome { dir, result });
    }

    Ok(outcomes)
}

/// State of a single locked root dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageStatus {
    pub name: String,

    /// Declared version range.
    pub version: String,

    /// Version which is currently locked.
    pub version_resolve: String,

    pub locked_signature: Signature,

    /// Signature of the locked version within the store, if it is still
    /// published.
    pub published_signature: Option<Signature>,

    /// Newest published version which satisfies the declared range.
    pub latest_compatible: Option<String>,

    /// Every published version of the package.
    pub versions: Vec<String>,
}

impl PackageStatus {
    /// Determines whether the locked signature matches the published one.
    pub fn is_fresh(&self) -> bool {
        self.published_signature.as_ref() == Some(&self.locked_signature)
    }

    /// Determines whether the locked version is the newest compatible one.
    pub fn is_latest(&self) -> bool {
        self.latest_compatible.as_deref() == Some(self.version_resolve.as_str())
    }
}

/// Lists the status of every root dependency locked in `cwd`.
///
/// # Errors
///
/// Returns `Err` if the project has no lock file.
pub fn list(session: &mut Session, cwd: &Path) -> Result<Vec<PackageStatus>> {
    let lock = LockFile::read(cwd)?;
    let mut statuses = Vec::with_capacity(lock.pkgs.len());

    for (name, locked) in &lock.pkgs {
        let publish_name = session.specifiers.publishable_name(name, &locked.version_resolve)?;

        let latest_compatible = match session.store.compatible_versions(name, Some(&locked.version)) {
            Ok(compatible) => compatible.into_iter().next(),
            Err(err) => {
                tracing::debug!("no compatible versions of {name}: {}", err.message());
                None
            }
        };

        statuses.push(PackageStatus {
            name: name.clone(),
            version: locked.version.clone(),
            version_resolve: locked.version_resolve.clone(),
            locked_signature: locked.signature.clone(),
            published_signature: session
                .store
                .get(&publish_name)
                .map(|artifact| artifact.pack_signature.clone()),
            latest_compatible,
            versions: session.store.versions(name).to_vec(),
        });
    }

    Ok(statuses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::NoCommits;
    use crate::scripts::SkipScripts;
    use crate::sync::{AddOptions, add_packages};

    struct Fixture {
        _home: tempfile::TempDir,
        workspace: tempfile::TempDir,
        session: Session,
    }

    impl Fixture {
        fn new() -> Self {
            let home = tempfile::tempdir().unwrap();
            let session = Session::open(home.path())
                .unwrap()
                .with_scripts(SkipScripts)
                .with_committer(NoCommits);

            Fixture {
                _home: home,
                workspace: tempfile::tempdir().unwrap(),
                session,
            }
        }

        fn package(&self, dir: &str, name: &str, version: &str, source: &str) -> PathBuf {
            let dir = self.workspace.path().join(dir);
            std::fs::create_dir_all(&dir).unwrap();

            std::fs::write(
                dir.join(MANIFEST_FILE_NAME),
                format!("{{\n  \"name\": \"{name}\",\n  \"version\": \"{version}\"\n}}\n"),
            )
            .unwrap();
            std::fs::write(dir.join("index.js"), source).unwrap();

            dir
        }

        fn add(&mut self, dir: &Path, package: &str) {
            let mut manifest = Manifest::read(dir).unwrap();

            add_packages(
                &mut self.session,
                &mut manifest,
                &[package.to_string()],
                AddOptions {
                    import: true,
                    ..AddOptions::default()
                },
            )
            .unwrap();
        }
    }

    #[test]
    fn publish_records_artifact() {
        let mut fixture = Fixture::new();
        let lib = fixture.package("lib", "@org/lib", "1.0.0", "one");

        let published = publish(&mut fixture.session, &lib).unwrap();

        assert_eq!(published.publish_name, "@org/lib@1.0.0");
        assert_eq!(published.pack.entry_files.len(), 2);
        assert_eq!(published.signature.content, published.pack.content_hash);
        assert_eq!(published.signature.manifest.len(), 32);
        assert!(published.path.join("index.js").is_file());
        assert_eq!(fixture.session.store.versions("@org/lib"), ["1.0.0"]);

        let reopened = crate::store::GlobalStore::open(fixture.session.store.root()).unwrap();
        assert_eq!(reopened.get("@org/lib@1.0.0").unwrap().pack_signature, published.signature);
    }

    #[test]
    fn republish_changes_content_half_only() {
        let mut fixture = Fixture::new();
        let lib = fixture.package("lib", "lib", "1.0.0", "one");

        let first = publish(&mut fixture.session, &lib).unwrap();
        std::fs::write(lib.join("index.js"), "two").unwrap();
        let second = publish(&mut fixture.session, &lib).unwrap();

        assert!(first.signature.same_manifest(&second.signature));
        assert!(!first.signature.same_content(&second.signature));
    }

    #[test]
    fn publish_requires_version() {
        let mut fixture = Fixture::new();
        let dir = fixture.workspace.path().join("broken");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE_NAME), r#"{"name":"broken"}"#).unwrap();

        assert!(publish(&mut fixture.session, &dir).is_err());
    }

    #[test]
    fn publish_copies_lock_file() {
        let mut fixture = Fixture::new();
        let dep = fixture.package("dep", "dep", "1.0.0", "dep");
        let lib = fixture.package("lib", "lib", "1.0.0", "lib");

        publish(&mut fixture.session, &dep).unwrap();
        fixture.add(&lib, "dep");

        let published = publish(&mut fixture.session, &lib).unwrap();

        let lock = LockFile::read(&published.path).unwrap();
        assert!(lock.pkgs.contains_key("dep"));
    }

    #[test]
    fn unpublish_refuses_installed_packages() {
        let mut fixture = Fixture::new();
        let lib = fixture.package("lib", "lib", "1.0.0", "lib");
        let app = fixture.package("app", "app", "0.1.0", "app");

        let published = publish(&mut fixture.session, &lib).unwrap();
        fixture.add(&app, "lib");

        let err = unpublish(&mut fixture.session, &lib, false).unwrap_err();
        assert!(err.message().contains("still installed in 1 project"));

        let unpublished = unpublish(&mut fixture.session, &lib, true).unwrap();
        assert_eq!(unpublished.installations.len(), 1);
        assert!(fixture.session.store.get("lib@1.0.0").is_none());
        assert!(fixture.session.store.versions("lib").is_empty());
        assert!(!published.path.exists());

        assert!(unpublish(&mut fixture.session, &lib, true).is_err());
    }

    #[test]
    fn push_updates_transitive_installations() {
        let mut fixture = Fixture::new();
        let base = fixture.package("base", "base", "1.0.0", "v1");
        let mid = fixture.package("mid", "mid", "1.0.0", "mid");
        let app = fixture.package("app", "app", "0.1.0", "app");

        publish(&mut fixture.session, &base).unwrap();
        fixture.add(&mid, "base");
        publish(&mut fixture.session, &mid).unwrap();
        fixture.add(&app, "mid");

        std::fs::write(base.join("index.js"), "v2").unwrap();
        publish(&mut fixture.session, &base).unwrap();

        let outcomes = push(&mut fixture.session, &base).unwrap();
        let dirs = outcomes.iter().map(|outcome| outcome.dir.clone()).collect::<Vec<_>>();

        assert_eq!(dirs, [mid.clone(), app]);
        assert!(outcomes.iter().all(|outcome| outcome.result.is_ok()));

        assert_eq!(
            std::fs::read_to_string(mid.join(".zen/base@1.0.0/index.js")).unwrap(),
            "v2"
        );
    }

    #[test]
    fn push_of_unpublished_package_fails() {
        let mut fixture = Fixture::new();
        let lib = fixture.package("lib", "lib", "1.0.0", "lib");

        assert!(push(&mut fixture.session, &lib).is_err());
    }

    #[test]
    fn list_reports_freshness() {
        let mut fixture = Fixture::new();
        let lib = fixture.package("lib", "lib", "1.0.0", "one");
        let app = fixture.package("app", "app", "0.1.0", "app");

        publish(&mut fixture.session, &lib).unwrap();
        fixture.add(&app, "lib");

        let statuses = list(&mut fixture.session, &app).unwrap();
        assert_eq!(statuses.len(), 1);
        assert!(statuses[0].is_fresh());
        assert!(statuses[0].is_latest());

        std::fs::write(lib.join("index.js"), "two").unwrap();
        publish(&mut fixture.session, &lib).unwrap();

        let lib = fixture.package("lib2", "lib", "1.1.0", "three");
        publish(&mut fixture.session, &lib).unwrap();

        let statuses = list(&mut fixture.session, &app).unwrap();
        assert!(!statuses[0].is_fresh());
        assert!(!statuses[0].is_latest());
        assert_eq!(statuses[0].latest_compatible.as_deref(), Some("1.1.0"));
        assert_eq!(statuses[0].versions, ["1.0.0", "1.1.0"]);
    }

    #[test]
    fn list_requires_lock_file() {
        let mut fixture = Fixture::new();
        let app = fixture.package("app", "app", "0.1.0", "app");

        assert!(list(&mut fixture.session, &app).is_err());
    }
}
