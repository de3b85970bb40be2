use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};
use sha2::{Digest, Sha256};
use zen_errors::{IntoDiagnostic, Result};

use crate::errors::*;
use crate::reconcile::IMPORT_DIR;

/// Directories which are never included in a packed package.
pub const EXCLUDED_DIRS: &[&str] = &["node_modules", ".git", IMPORT_DIR];

/// Result of packing a package directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackOutput {
    /// Lowercase hexadecimal digest of every packed path and its contents.
    pub content_hash: String,

    /// Packed files, relative to the package directory, in sorted order.
    pub entry_files: Vec<PathBuf>,

    pub size_bytes: u64,
}

/// Creates artifacts out of package directories, and places artifacts into
/// consuming projects.
pub trait Packer {
    /// Packs the package in `dir` into the `out` directory, replacing any
    /// existing content of `out`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the package could not be read or the output could not
    /// be written.
    fn pack(&self, dir: &Path, out: &Path) -> Result<PackOutput>;

    /// Places the artifact at `artifact` into `destination`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the artifact could not be copied.
    fn materialize(&self, artifact: &Path, destination: &Path) -> Result<()>;
}

/// Packs packages as plain directory copies.
#[derive(Default, Debug, Clone, Copy)]
pub struct DirectoryPacker;

impl DirectoryPacker {
    /// Lists every file in `dir` which would be packed, relative to `dir`.
    ///
    /// Files inside of `exclude` are skipped, along with every directory in
    /// [`EXCLUDED_DIRS`].
    ///
    /// # Errors
    ///
    /// Returns `Err` if the directory could not be enumerated.
    pub fn files(dir: &Path, exclude: Option<&Path>) -> Result<Vec<PathBuf>> {
        let pattern = format!("{}/**/*", Pattern::escape(&dir.to_string_lossy()));

        let options = MatchOptions {
            require_literal_leading_dot: false,
            ..MatchOptions::new()
        };

        let paths = glob::glob_with(&pattern, options).map_err(|err| PackGlobError {
            dir: dir.to_path_buf(),
            inner: vec![err.into_diagnostic()],
        })?;

        let mut files = Vec::new();

        for path in paths {
            let path = path.map_err(|err| PackGlobError {
                dir: dir.to_path_buf(),
                inner: vec![err.into_diagnostic()],
            })?;

            if !path.is_file() || exclude.is_some_and(|exclude| path.starts_with(exclude)) {
                continue;
            }

            let Ok(relative) = path.strip_prefix(dir) else {
                continue;
            };

            let excluded = relative.components().any(|component| match component {
                Component::Normal(name) => EXCLUDED_DIRS.iter().any(|excluded| name == *excluded),
                _ => false,
            });

            if !excluded {
                files.push(relative.to_path_buf());
            }
        }

        files.sort();

        Ok(files)
    }
}

/// Renders a relative path with forward slashes, so hashes match across
/// platforms.
fn portable_path(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

impl Packer for DirectoryPacker {
    #[tracing::instrument(level = "DEBUG", skip(self), err)]
    fn pack(&self, dir: &Path, out: &Path) -> Result<PackOutput> {
        if dir.starts_with(out) {
            return Err(InvalidPackDestination {
                dir: dir.to_path_buf(),
                out: out.to_path_buf(),
            }
            .into());
        }

        let files = Self::files(dir, Some(out))?;

        crate::fs::remove(out)?;
        crate::fs::create_dir(out)?;

        let mut hasher = Sha256::new();
        let mut size_bytes = 0u64;

        for relative in &files {
            let source = dir.join(relative);
            let content = std::fs::read(&source).map_err(|err| FileReadError {
                path: source.clone(),
                inner: vec![err.into_diagnostic()],
            })?;

            hasher.update(portable_path(relative).as_bytes());
            hasher.update([0]);
            hasher.update(&content);

            size_bytes += content.len() as u64;

            let target = out.join(relative);
            if let Some(parent) = target.parent() {
                crate::fs::create_dir(parent)?;
            }

            std::fs::write(&target, &content).map_err(|err| FileWriteError {
                path: target.clone(),
                inner: vec![err.into_diagnostic()],
            })?;

            tracing::trace!("packed {}", relative.display());
        }

        Ok(PackOutput {
            content_hash: hex::encode(hasher.finalize()),
            entry_files: files,
            size_bytes,
        })
    }

    fn materialize(&self, artifact: &Path, destination: &Path) -> Result<()> {
        crate::fs::create_dir(destination)?;
        crate::fs::copy(artifact, destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package(dir: &Path) {
        std::fs::create_dir_all(dir.join("src")).unwrap();
        std::fs::create_dir_all(dir.join("node_modules/dep")).unwrap();
        std::fs::create_dir_all(dir.join(".zen/lib@1.0.0")).unwrap();
        std::fs::create_dir_all(dir.join(".git")).unwrap();

        std::fs::write(dir.join("package.json"), r#"{"name":"lib","version":"1.0.0"}"#).unwrap();
        std::fs::write(dir.join("src/index.js"), "export default 1").unwrap();
        std::fs::write(dir.join(".npmrc"), "").unwrap();
        std::fs::write(dir.join("node_modules/dep/index.js"), "").unwrap();
        std::fs::write(dir.join(".zen/lib@1.0.0/index.js"), "").unwrap();
        std::fs::write(dir.join(".git/HEAD"), "").unwrap();
    }

    #[test]
    fn lists_files_without_excluded_dirs() {
        let dir = tempfile::tempdir().unwrap();
        package(dir.path());

        let files = DirectoryPacker::files(dir.path(), None).unwrap();

        assert_eq!(
            files,
            vec![
                PathBuf::from(".npmrc"),
                PathBuf::from("package.json"),
                PathBuf::from("src/index.js"),
            ]
        );
    }

    #[test]
    fn packs_into_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        package(dir.path());

        let output = DirectoryPacker.pack(dir.path(), &out.path().join("lib/1.0.0")).unwrap();

        assert_eq!(output.entry_files.len(), 3);
        assert_eq!(output.content_hash.len(), 64);
        assert_eq!(output.size_bytes, 48);
        assert!(out.path().join("lib/1.0.0/src/index.js").is_file());
        assert!(!out.path().join("lib/1.0.0/node_modules").exists());
    }

    #[test]
    fn content_hash_tracks_contents() {
        let dir = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        package(dir.path());

        let first = DirectoryPacker.pack(dir.path(), out.path()).unwrap();
        let second = DirectoryPacker.pack(dir.path(), out.path()).unwrap();
        assert_eq!(first.content_hash, second.content_hash);

        std::fs::write(dir.path().join("src/index.js"), "export default 2").unwrap();
        let third = DirectoryPacker.pack(dir.path(), out.path()).unwrap();
        assert_ne!(first.content_hash, third.content_hash);

        std::fs::write(dir.path().join("node_modules/dep/index.js"), "changed").unwrap();
        let fourth = DirectoryPacker.pack(dir.path(), out.path()).unwrap();
        assert_eq!(third.content_hash, fourth.content_hash);
    }

    #[test]
    fn output_inside_package_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        package(dir.path());

        let out = dir.path().join("dist");
        DirectoryPacker.pack(dir.path(), &out).unwrap();
        let output = DirectoryPacker.pack(dir.path(), &out).unwrap();

        assert!(!output.entry_files.iter().any(|file| file.starts_with("dist")));
    }

    #[test]
    fn output_containing_package_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        package(dir.path());

        assert!(DirectoryPacker.pack(dir.path(), dir.path()).is_err());
        assert!(dir.path().join("package.json").is_file());
    }

    #[test]
    fn materialize_copies_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        package(dir.path());

        DirectoryPacker
            .materialize(&dir.path().join("src"), &target.path().join("node_modules/lib"))
            .unwrap();

        assert!(target.path().join("node_modules/lib/index.js").is_file());
    }
}
