use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use zen_errors::{IntoDiagnostic, MapDiagnostic, Result};

use crate::errors::*;
use crate::signature::Signature;

/// Name of the lock file within a project directory.
pub const LOCK_FILE_NAME: &str = "zen.lock.json";

/// Schema version of lock files written by this crate.
pub const LOCK_VERSION: &str = "0";

/// Locked state of a root dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedPackage {
    #[serde(default)]
    pub import: bool,

    pub signature: Signature,

    #[serde(default)]
    pub traverse_imports: bool,

    /// Declared version range.
    pub version: String,

    /// Exact version the range resolved to.
    pub version_resolve: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFile {
    pub version: String,

    /// Root dependencies, keyed by package name.
    #[serde(default)]
    pub pkgs: IndexMap<String, LockedPackage>,

    /// Signatures of transitive dependencies, keyed by lineage.
    #[serde(default)]
    pub tree: IndexMap<String, Signature>,
}

impl Default for LockFile {
    fn default() -> Self {
        LockFile {
            version: LOCK_VERSION.to_string(),
            pkgs: IndexMap::new(),
            tree: IndexMap::new(),
        }
    }
}

impl LockFile {
    /// Reads the lock file of the given directory.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the directory has no lock file, or if it could not be
    /// read or parsed.
    pub fn read(dir: &Path) -> Result<LockFile> {
        let path = dir.join(LOCK_FILE_NAME);

        if !path.is_file() {
            return Err(LockFileMissing { dir: dir.to_path_buf() }.into());
        }

        Self::read_file(&path)
    }

    /// Reads the lock file of the given directory, falling back to an empty
    /// lock file if it is missing or written with another schema version.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the lock file exists, but could not be read or parsed.
    pub fn read_or_default(dir: &Path) -> Result<LockFile> {
        let path = dir.join(LOCK_FILE_NAME);

        if !path.is_file() {
            tracing::debug!("no lock file in {}, starting from empty", dir.display());
            return Ok(LockFile::default());
        }

        let content = read_content(&path)?;
        let value: serde_json::Value = parse(&path, &content)?;

        if value.get("version").and_then(serde_json::Value::as_str) != Some(LOCK_VERSION) {
            tracing::warn!("discarding lock file {} with unsupported schema version", path.display());
            return Ok(LockFile::default());
        }

        serde_json::from_value(value).map_err(|err| {
            MalformedJson {
                path,
                inner: vec![err.into_diagnostic()],
            }
            .into()
        })
    }

    fn read_file(path: &Path) -> Result<LockFile> {
        let content = read_content(path)?;

        parse(path, &content)
    }

    /// Writes the lock file into the given directory, replacing any existing
    /// lock file.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the lock file could not be written.
    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join(LOCK_FILE_NAME);
        let mut content = serde_json::to_string_pretty(self).map_diagnostic()?;
        content.push('\n');

        std::fs::write(&path, content).map_err(|err| {
            FileWriteError {
                path,
                inner: vec![err.into_diagnostic()],
            }
            .into()
        })
    }
}

fn read_content(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|err| {
        FileReadError {
            path: path.to_path_buf(),
            inner: vec![err.into_diagnostic()],
        }
        .into()
    })
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, content: &str) -> Result<T> {
    serde_json::from_str(content).map_err(|err| {
        MalformedJson {
            path: path.to_path_buf(),
            inner: vec![err.into_diagnostic()],
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LockFile {
        let mut lock = LockFile::default();

        lock.pkgs.insert(
            String::from("lib"),
            LockedPackage {
                import: true,
                signature: Signature::new("aa", "bb"),
                traverse_imports: false,
                version: String::from("^1.0.0"),
                version_resolve: String::from("1.2.0"),
            },
        );

        lock.tree
            .insert(String::from("lib@1.2.0>>dep@0.1.0"), Signature::new("cc", "dd"));

        lock
    }

    #[test]
    fn written_lock_is_read_back() {
        let dir = tempfile::tempdir().unwrap();

        sample().write(dir.path()).unwrap();

        assert_eq!(LockFile::read(dir.path()).unwrap(), sample());
        assert_eq!(LockFile::read_or_default(dir.path()).unwrap(), sample());
    }

    #[test]
    fn missing_lock() {
        let dir = tempfile::tempdir().unwrap();

        assert!(LockFile::read(dir.path()).is_err());
        assert_eq!(LockFile::read_or_default(dir.path()).unwrap(), LockFile::default());
    }

    #[test]
    fn schema_mismatch_resets() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(LOCK_FILE_NAME),
            r#"{"version":"7","pkgs":{"lib":{"weird":true}},"tree":{}}"#,
        )
        .unwrap();

        assert_eq!(LockFile::read_or_default(dir.path()).unwrap(), LockFile::default());
    }

    #[test]
    fn malformed_lock_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(LOCK_FILE_NAME), "{").unwrap();

        assert!(LockFile::read_or_default(dir.path()).is_err());
    }

    #[test]
    fn reads_rows_without_flags() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(LOCK_FILE_NAME),
            r#"{"version":"0","pkgs":{"lib":{"signature":"aa=bb","version":"*","version_resolve":"1.0.0"}},"tree":{}}"#,
        )
        .unwrap();

        let lock = LockFile::read(dir.path()).unwrap();
        let row = &lock.pkgs["lib"];

        assert!(!row.import);
        assert!(!row.traverse_imports);
        assert_eq!(row.signature, Signature::new("aa", "bb"));
    }
}
