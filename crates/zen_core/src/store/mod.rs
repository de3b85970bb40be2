//! The global store, which records every published package of the current
//! user.
//!
//! The store is a single JSON document inside the zen home directory. It maps
//! publishable names (`fullName@version`) to the location and signature of the
//! published artifact, along with the project directories which have the
//! artifact installed. A second map indexes every published version by package
//! name, which is what version ranges are resolved against.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use indexmap::IndexMap;
use semver::Version;
use serde::{Deserialize, Serialize};
use zen_errors::{IntoDiagnostic, MapDiagnostic, Result};

use crate::errors::*;
use crate::home::PACKAGES_FOLDER;
use crate::signature::Signature;
use crate::specifier::{Specifier, SpecifierCache};
use crate::versions::{Range, sort_descending};

/// Name of the store document within the zen home directory.
pub const STORE_FILE_NAME: &str = "global.store.json";

/// Name of the advisory lock file within the zen home directory.
pub const STORE_LOCK_FILE_NAME: &str = "global.store.lock";

/// A project directory which has a published package installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub path: String,
}

/// Record of a single published version of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedArtifact {
    /// Project directories which have this artifact installed.
    #[serde(default)]
    pub installations: Vec<Installation>,

    pub pack_signature: Signature,

    /// Directory which holds the packed artifact.
    pub resolve: PathBuf,
}

impl PublishedArtifact {
    /// Determines whether the artifact is recorded as installed in `dir`.
    pub fn is_installed_in(&self, dir: &Path) -> bool {
        let dir = dir.to_string_lossy();

        self.installations.iter().any(|installation| installation.path == dir)
    }
}

/// On-disk representation of the store.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub store: IndexMap<String, PublishedArtifact>,

    #[serde(default)]
    pub version_tree: IndexMap<String, Vec<String>>,
}

/// Exclusive lock over the global store, which is released once dropped.
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
}

#[derive(Debug)]
pub struct GlobalStore {
    root: PathBuf,
    data: StoreData,
}

impl GlobalStore {
    /// Opens the store inside of the given home directory, creating both the
    /// directory and an empty store if they don't exist yet.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the store could not be created, read or parsed.
    #[tracing::instrument(level = "DEBUG", skip_all, fields(root = %root.as_ref().display()), err)]
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        crate::fs::create_dir(&root)?;

        let path = root.join(STORE_FILE_NAME);

        let data = if path.is_file() {
            let content = std::fs::read_to_string(&path).map_err(|err| FileReadError {
                path: path.clone(),
                inner: vec![err.into_diagnostic()],
            })?;

            serde_json::from_str(&content).map_err(|err| MalformedJson {
                path: path.clone(),
                inner: vec![err.into_diagnostic()],
            })?
        } else {
            tracing::debug!("creating empty global store at {}", path.display());

            let store = GlobalStore {
                root: root.clone(),
                data: StoreData::default(),
            };

            store.save()?;
            store.data
        };

        Ok(GlobalStore { root, data })
    }

    /// Takes an exclusive advisory lock on the store inside of the given home
    /// directory, blocking until any other holder releases it.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the lock file could not be created or locked.
    pub fn lock(root: impl AsRef<Path>) -> Result<StoreLock> {
        let root = root.as_ref();
        crate::fs::create_dir(root)?;

        let path = root.join(STORE_LOCK_FILE_NAME);

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|err| StoreLockError {
                path: path.clone(),
                inner: vec![err.into_diagnostic()],
            })?;

        tracing::trace!("waiting for store lock at {}", path.display());

        file.lock_exclusive().map_err(|err| StoreLockError {
            path: path.clone(),
            inner: vec![err.into_diagnostic()],
        })?;

        Ok(StoreLock { _file: file })
    }

    /// Writes the entire store back to disk.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the store could not be serialized or written.
    pub fn save(&self) -> Result<()> {
        let path = self.root.join(STORE_FILE_NAME);
        let content = serde_json::to_string_pretty(&self.data).map_diagnostic()?;

        std::fs::write(&path, content).map_err(|err| {
            FileWriteError {
                path,
                inner: vec![err.into_diagnostic()],
            }
            .into()
        })
    }

    /// Gets the home directory which contains the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn data(&self) -> &StoreData {
        &self.data
    }

    /// Gets the directory which holds all published packages.
    pub fn packages_dir(&self) -> PathBuf {
        self.root.join(PACKAGES_FOLDER)
    }

    /// Gets the directory which the given package version is published into.
    pub fn artifact_dir(&self, specifier: &Specifier) -> PathBuf {
        self.packages_dir()
            .join(&specifier.full_name)
            .join(specifier.version.as_deref().unwrap_or_default())
    }

    /// Gets the artifact published under the given publishable name.
    pub fn get(&self, publish_name: &str) -> Option<&PublishedArtifact> {
        self.data.store.get(publish_name)
    }

    /// Gets every version of the given package, in the order they were
    /// first published.
    pub fn versions(&self, name: &str) -> &[String] {
        self.data.version_tree.get(name).map_or(&[], Vec::as_slice)
    }

    /// Records a new publish of `name` at `version`.
    ///
    /// The version is added to the version index if missing. An existing record
    /// keeps its installations, except for those whose directory no longer
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `name` is not a valid package name.
    pub fn record_publish(
        &mut self,
        specifiers: &mut SpecifierCache,
        name: &str,
        version: &str,
        signature: Signature,
    ) -> Result<&PublishedArtifact> {
        let publish_name = specifiers.publishable_name(name, version)?;
        let resolve = self.artifact_dir(&specifiers.parse(&publish_name)?);

        let versions = self.data.version_tree.entry(name.to_string()).or_default();
        if !versions.iter().any(|existing| existing == version) {
            versions.push(version.to_string());
        }

        let artifact = self
            .data
            .store
            .entry(publish_name)
            .and_modify(|artifact| {
                artifact.installations.retain(|installation| {
                    let exists = Path::new(&installation.path).exists();

                    if !exists {
                        tracing::debug!("pruning stale installation {}", installation.path);
                    }

                    exists
                });
            })
            .or_insert_with(|| PublishedArtifact {
                installations: Vec::new(),
                pack_signature: Signature::default(),
                resolve: PathBuf::new(),
            });

        artifact.pack_signature = signature;
        artifact.resolve = resolve;

        Ok(artifact)
    }

    /// Finds the published versions of `name` which satisfy the given range,
    /// ordered newest-first.
    ///
    /// Without a range, only the newest release is returned.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the package was never published or if the range is
    /// invalid.
    pub fn compatible_versions(&self, name: &str, range: Option<&str>) -> Result<Vec<String>> {
        let Some(recorded) = self.data.version_tree.get(name) else {
            return Err(PackageNeverPublished { name: name.to_string() }.into());
        };

        let mut versions = recorded
            .iter()
            .filter_map(|recorded| match Version::parse(recorded) {
                Ok(version) => Some((recorded.clone(), version)),
                Err(err) => {
                    tracing::warn!("skipping invalid version {recorded} of {name}: {err}");
                    None
                }
            })
            .collect::<Vec<_>>();

        let explicit = range.is_some();
        let range = Range::parse(range.unwrap_or("*"))?;
        versions.retain(|(_, version)| range.matches(version));

        sort_descending(&mut versions);

        if !explicit {
            versions.truncate(1);
        }

        Ok(versions.into_iter().map(|(recorded, _)| recorded).collect())
    }

    /// Looks up the artifact of `name` at `version`.
    ///
    /// When no artifact is published under the exact version and `allow_range`
    /// is set, `version` is treated as a range and the newest compatible
    /// version is used instead.
    ///
    /// # Errors
    ///
    /// Returns `Err` if no artifact could be found.
    pub fn resolve_published(
        &self,
        specifiers: &mut SpecifierCache,
        name: &str,
        version: &str,
        allow_range: bool,
    ) -> Result<(String, &PublishedArtifact)> {
        let mut publish_name = specifiers.publishable_name(name, version)?;

        if !self.data.store.contains_key(&publish_name) && allow_range {
            let compatible = self.compatible_versions(name, Some(version))?;

            let Some(best) = compatible.first() else {
                return Err(NoCompatibleVersion {
                    name: name.to_string(),
                    range: version.to_string(),
                }
                .into());
            };

            publish_name = specifiers.publishable_name(name, best)?;
        }

        match self.data.store.get(&publish_name) {
            Some(artifact) => Ok((publish_name, artifact)),
            None => Err(PackageNotPublished { name: publish_name }.into()),
        }
    }

    /// Removes the record of `name` at `version`, along with its entry in the
    /// version index.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `name` is not a valid package name.
    pub fn unpublish(
        &mut self,
        specifiers: &mut SpecifierCache,
        name: &str,
        version: &str,
    ) -> Result<Option<PublishedArtifact>> {
        let publish_name = specifiers.publishable_name(name, version)?;
        let removed = self.data.store.shift_remove(&publish_name);

        if let Some(versions) = self.data.version_tree.get_mut(name) {
            versions.retain(|existing| existing != version);

            if versions.is_empty() {
                self.data.version_tree.shift_remove(name);
            }
        }

        Ok(removed)
    }

    /// Records `dir` as an installation of the given artifact.
    ///
    /// Returns `false` if no artifact is published under the given name.
    pub fn add_installation(&mut self, publish_name: &str, dir: &Path) -> bool {
        let Some(artifact) = self.data.store.get_mut(publish_name) else {
            return false;
        };

        if !artifact.is_installed_in(dir) {
            artifact.installations.push(Installation {
                path: dir.to_string_lossy().into_owned(),
            });
        }

        true
    }

    /// Removes `dir` from the installations of the given artifact.
    ///
    /// Returns `false` if no artifact is published under the given name.
    pub fn remove_installation(&mut self, publish_name: &str, dir: &Path) -> bool {
        let Some(artifact) = self.data.store.get_mut(publish_name) else {
            return false;
        };

        let dir = dir.to_string_lossy();
        artifact.installations.retain(|installation| installation.path != dir);

        true
    }
}
