use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use zen_errors::{MapDiagnostic, Result};

/// Delimiter between the two halves of a rendered [`Signature`].
pub const SIGNATURE_DELIMITER: char = '=';

/// Fingerprint of a published package.
///
/// The content half changes whenever any packed file changes, while the
/// manifest half only changes when `package.json` itself does. Both halves are
/// lowercase hexadecimal, so the delimiter never occurs within either one.
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub content: String,
    pub manifest: String,
}

impl Signature {
    pub fn new(content: impl Into<String>, manifest: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            manifest: manifest.into(),
        }
    }

    /// Creates a signature from a content hash and the full digest of the
    /// package manifest, of which only the first half is kept.
    pub fn from_digests(content: impl Into<String>, manifest_digest: &str) -> Self {
        let half = manifest_digest.len() / 2;

        Self::new(content, &manifest_digest[..half])
    }

    /// Determines whether both signatures were taken from the same manifest.
    pub fn same_manifest(&self, other: &Signature) -> bool {
        self.manifest == other.manifest
    }

    /// Determines whether both signatures were taken from the same package
    /// contents.
    pub fn same_content(&self, other: &Signature) -> bool {
        self.content == other.content
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{SIGNATURE_DELIMITER}{}", self.content, self.manifest)
    }
}

impl FromStr for Signature {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.split_once(SIGNATURE_DELIMITER) {
            Some((content, manifest)) => Signature::new(content, manifest),
            None => Signature::new(s, ""),
        })
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;

        Ok(match raw.parse() {
            Ok(signature) => signature,
            Err(never) => match never {},
        })
    }
}

/// Computes the lowercase hexadecimal SHA-256 digest of the file at `path`.
///
/// # Errors
///
/// Returns `Err` if the file could not be read.
pub fn file_digest(path: &Path) -> Result<String> {
    let content = std::fs::read(path).map_cause(format!("could not read {}", path.display()))?;

    Ok(hex::encode(Sha256::digest(&content)))
}
