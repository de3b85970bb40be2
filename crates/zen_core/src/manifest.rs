use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use zen_errors::{IntoDiagnostic, MapDiagnostic, Result};

use crate::errors::*;

/// Name of the manifest file within a package directory.
pub const MANIFEST_FILE_NAME: &str = "package.json";

/// Key of the zen configuration block within the manifest.
pub const ZEN_CONFIG_KEY: &str = ".zen";

/// Prefix of dependency values which point to a local path.
pub const FILE_PREFIX: &str = "file:";

const DEFAULT_INDENT: &str = "  ";

/// Dependency scopes of a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyScope {
    Dependencies,
    DevDependencies,
    PeerDependencies,
    OptionalDependencies,
}

impl DependencyScope {
    pub const ALL: [DependencyScope; 4] = [
        DependencyScope::Dependencies,
        DependencyScope::DevDependencies,
        DependencyScope::PeerDependencies,
        DependencyScope::OptionalDependencies,
    ];

    /// Gets the key of the scope, as used in the manifest.
    pub fn key(self) -> &'static str {
        match self {
            DependencyScope::Dependencies => "dependencies",
            DependencyScope::DevDependencies => "devDependencies",
            DependencyScope::PeerDependencies => "peerDependencies",
            DependencyScope::OptionalDependencies => "optionalDependencies",
        }
    }
}

impl std::fmt::Display for DependencyScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A dependency declared in the zen configuration block.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZenDependency {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traverse_imports: Option<bool>,

    pub version: String,
}

impl ZenDependency {
    pub fn imports(&self) -> bool {
        self.import.unwrap_or_default()
    }

    pub fn traverses_imports(&self) -> bool {
        self.traverse_imports.unwrap_or_default()
    }
}

/// Settings for committing the changes zen makes to git.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitConfig {
    /// Commit changes automatically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto: Option<bool>,

    /// Also commit changes to `package.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_commits: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Hide the output of git.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppress_logs: Option<bool>,

    /// Maximum length of commit messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trim_commit_messages: Option<usize>,
}

/// The zen configuration block of a manifest.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZenConfig {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: IndexMap<String, ZenDependency>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dev_dependencies: IndexMap<String, ZenDependency>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub peer_dependencies: IndexMap<String, ZenDependency>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub optional_dependencies: IndexMap<String, ZenDependency>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitConfig>,

    /// Keys of the block which zen does not know about.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl ZenConfig {
    pub fn scope(&self, scope: DependencyScope) -> &IndexMap<String, ZenDependency> {
        match scope {
            DependencyScope::Dependencies => &self.dependencies,
            DependencyScope::DevDependencies => &self.dev_dependencies,
            DependencyScope::PeerDependencies => &self.peer_dependencies,
            DependencyScope::OptionalDependencies => &self.optional_dependencies,
        }
    }

    pub fn scope_mut(&mut self, scope: DependencyScope) -> &mut IndexMap<String, ZenDependency> {
        match scope {
            DependencyScope::Dependencies => &mut self.dependencies,
            DependencyScope::DevDependencies => &mut self.dev_dependencies,
            DependencyScope::PeerDependencies => &mut self.peer_dependencies,
            DependencyScope::OptionalDependencies => &mut self.optional_dependencies,
        }
    }

    /// Iterates over every declared dependency, along with its scope.
    pub fn declarations(&self) -> impl Iterator<Item = (DependencyScope, &String, &ZenDependency)> {
        DependencyScope::ALL
            .into_iter()
            .flat_map(move |scope| self.scope(scope).iter().map(move |(name, dep)| (scope, name, dep)))
    }

    /// Removes the dependency from every scope, returning whether it was
    /// declared in any of them.
    pub fn remove_everywhere(&mut self, name: &str) -> bool {
        let mut removed = false;

        for scope in DependencyScope::ALL {
            removed |= self.scope_mut(scope).shift_remove(name).is_some();
        }

        removed
    }
}

/// A `package.json` document.
///
/// The document keeps the order of its keys and the indentation of the file
/// it was read from, so writing it back only changes what was edited.
#[derive(Debug, Clone)]
pub struct Manifest {
    dir: PathBuf,
    document: Map<String, Value>,
    indent: String,
    trailing_newline: bool,
    dirty: bool,
}

impl Manifest {
    /// Reads the manifest of the given directory.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the directory has no manifest, or if it could not be
    /// read or parsed as a JSON object.
    pub fn read(dir: &Path) -> Result<Manifest> {
        let path = dir.join(MANIFEST_FILE_NAME);

        if !path.is_file() {
            return Err(ManifestMissing { dir: dir.to_path_buf() }.into());
        }

        let content = std::fs::read_to_string(&path).map_err(|err| FileReadError {
            path: path.clone(),
            inner: vec![err.into_diagnostic()],
        })?;

        Self::parse(dir, &content)
    }

    /// Reads the manifest of the given directory, which must define every
    /// one of the given fields.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the manifest could not be read, or if any of the fields
    /// are missing.
    pub fn read_requiring(dir: &Path, fields: &[&str]) -> Result<Manifest> {
        let manifest = Self::read(dir)?;

        for field in fields {
            manifest.require(field)?;
        }

        Ok(manifest)
    }

    /// Parses the given manifest content, as if it was read from `dir`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the content is not a JSON object.
    pub fn parse(dir: &Path, content: &str) -> Result<Manifest> {
        let document = serde_json::from_str::<Map<String, Value>>(content).map_err(|err| MalformedJson {
            path: dir.join(MANIFEST_FILE_NAME),
            inner: vec![err.into_diagnostic()],
        })?;

        Ok(Manifest {
            dir: dir.to_path_buf(),
            document,
            indent: detect_indent(content),
            trailing_newline: content.ends_with('\n'),
            dirty: false,
        })
    }

    /// Gets the directory which contains the manifest.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Gets the path of the manifest file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE_NAME)
    }

    fn string_field(&self, field: &str) -> Option<&str> {
        self.document.get(field).and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.string_field("name")
    }

    pub fn version(&self) -> Option<&str> {
        self.string_field("version")
    }

    /// Gets the given string field of the manifest.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the field is missing or isn't a string.
    pub fn require(&self, field: &str) -> Result<&str> {
        self.string_field(field).ok_or_else(|| {
            MissingManifestField {
                dir: self.dir.clone(),
                field: field.to_string(),
            }
            .into()
        })
    }

    /// Gets the command of the given script, if defined.
    pub fn script(&self, name: &str) -> Option<&str> {
        self.document.get("scripts")?.get(name)?.as_str()
    }

    /// Parses the zen configuration block, which is empty when absent.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the block doesn't match the expected structure.
    pub fn zen(&self) -> Result<ZenConfig> {
        let Some(block) = self.document.get(ZEN_CONFIG_KEY) else {
            return Ok(ZenConfig::default());
        };

        ZenConfig::deserialize(block).map_err(|err| {
            MalformedJson {
                path: self.path(),
                inner: vec![err.into_diagnostic()],
            }
            .into()
        })
    }

    /// Replaces the zen configuration block.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the configuration could not be serialized.
    pub fn set_zen(&mut self, config: &ZenConfig) -> Result<()> {
        let value = serde_json::to_value(config).map_diagnostic()?;

        self.set(ZEN_CONFIG_KEY, value);

        Ok(())
    }

    fn set(&mut self, key: &str, value: Value) {
        if self.document.get(key) != Some(&value) {
            self.document.insert(key.to_string(), value);
            self.dirty = true;
        }
    }

    pub fn has_scope(&self, scope: DependencyScope) -> bool {
        self.document.get(scope.key()).is_some_and(Value::is_object)
    }

    /// Gets the value of the given dependency within the scope.
    pub fn dependency(&self, scope: DependencyScope, name: &str) -> Option<&str> {
        self.document.get(scope.key())?.get(name)?.as_str()
    }

    /// Sets the value of the given dependency within the scope, creating the
    /// scope if needed. Returns whether the value changed.
    pub fn set_dependency(&mut self, scope: DependencyScope, name: &str, value: &str) -> bool {
        if self.dependency(scope, name) == Some(value) {
            return false;
        }

        let entry = self
            .document
            .entry(scope.key())
            .or_insert_with(|| Value::Object(Map::new()));

        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }

        if let Value::Object(dependencies) = entry {
            dependencies.insert(name.to_string(), Value::String(value.to_string()));
        }

        self.dirty = true;

        true
    }

    /// Removes the given dependency from the scope, returning whether it was
    /// present.
    pub fn remove_dependency(&mut self, scope: DependencyScope, name: &str) -> bool {
        let removed = match self.document.get_mut(scope.key()) {
            Some(Value::Object(dependencies)) => dependencies.shift_remove(name).is_some(),
            _ => false,
        };

        self.dirty |= removed;

        removed
    }

    /// Removes the given dependency from every scope.
    pub fn remove_dependency_everywhere(&mut self, name: &str) -> bool {
        let mut removed = false;

        for scope in DependencyScope::ALL {
            removed |= self.remove_dependency(scope, name);
        }

        removed
    }

    /// Renders the manifest with its original indentation.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the document could not be serialized.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(self.indent.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);

        self.document.serialize(&mut serializer).map_diagnostic()?;

        let mut content = String::from_utf8(buffer).map_diagnostic()?;

        if self.trailing_newline {
            content.push('\n');
        }

        Ok(content)
    }

    /// Writes the manifest back into its directory, if it has been changed
    /// since it was read. Returns whether the file was written.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the manifest could not be written.
    pub fn write(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }

        let path = self.path();
        let content = self.render()?;

        std::fs::write(&path, content).map_err(|err| FileWriteError {
            path,
            inner: vec![err.into_diagnostic()],
        })?;

        self.dirty = false;

        Ok(true)
    }
}

/// Finds the indentation of the first indented line.
fn detect_indent(content: &str) -> String {
    content
        .lines()
        .find_map(|line| {
            let trimmed = line.trim_start_matches([' ', '\t']);

            (!trimmed.is_empty() && trimmed.len() < line.len()).then(|| line[..line.len() - trimmed.len()].to_string())
        })
        .unwrap_or_else(|| String::from(DEFAULT_INDENT))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
    "name": "app",
    "version": "1.0.0",
    "scripts": {
        "zen-postadd": "echo added"
    },
    "dependencies": {
        "left-pad": "^1.0.0"
    },
    ".zen": {
        "dependencies": {
            "lib": { "version": "^1.0.0", "import": true }
        },
        "git": { "auto": true, "trimCommitMessages": 20 },
        "custom": 1
    }
}
"#;

    fn write_manifest(dir: &Path, content: &str) -> Manifest {
        std::fs::write(dir.join(MANIFEST_FILE_NAME), content).unwrap();

        Manifest::read(dir).unwrap()
    }

    #[test]
    fn missing_manifest() {
        let dir = tempfile::tempdir().unwrap();

        assert!(Manifest::read(dir.path()).is_err());
    }

    #[test]
    fn reads_fields() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_manifest(dir.path(), MANIFEST);

        assert_eq!(manifest.name(), Some("app"));
        assert_eq!(manifest.version(), Some("1.0.0"));
        assert_eq!(manifest.script("zen-postadd"), Some("echo added"));
        assert_eq!(manifest.script("prepack"), None);
        assert_eq!(
            manifest.dependency(DependencyScope::Dependencies, "left-pad"),
            Some("^1.0.0")
        );
    }

    #[test]
    fn required_fields() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), r#"{ "name": "app" }"#);

        assert!(Manifest::read_requiring(dir.path(), &["name"]).is_ok());
        assert!(Manifest::read_requiring(dir.path(), &["name", "version"]).is_err());
    }

    #[test]
    fn parses_zen_block() {
        let dir = tempfile::tempdir().unwrap();
        let zen = write_manifest(dir.path(), MANIFEST).zen().unwrap();

        let lib = &zen.dependencies["lib"];
        assert!(lib.imports());
        assert!(!lib.traverses_imports());
        assert_eq!(lib.version, "^1.0.0");

        let git = zen.git.unwrap();
        assert_eq!(git.auto, Some(true));
        assert_eq!(git.trim_commit_messages, Some(20));
        assert_eq!(zen.other["custom"], 1);
    }

    #[test]
    fn empty_zen_block_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = write_manifest(dir.path(), r#"{ "name": "app" }"#);

        assert_eq!(manifest.zen().unwrap(), ZenConfig::default());
    }

    #[test]
    fn unchanged_manifest_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let compact = r#"{"name":"app","dependencies":{"lib":"file:.zen/lib@1.0.0"}}"#;
        let mut manifest = write_manifest(dir.path(), compact);

        assert!(!manifest.set_dependency(DependencyScope::Dependencies, "lib", "file:.zen/lib@1.0.0"));
        assert!(!manifest.write().unwrap());

        assert_eq!(
            std::fs::read_to_string(dir.path().join(MANIFEST_FILE_NAME)).unwrap(),
            compact
        );
    }

    #[test]
    fn writes_with_original_indentation() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = write_manifest(dir.path(), MANIFEST);

        assert!(manifest.set_dependency(DependencyScope::DevDependencies, "lib", "file:.zen/lib@1.2.0"));
        assert!(manifest.write().unwrap());

        let written = std::fs::read_to_string(dir.path().join(MANIFEST_FILE_NAME)).unwrap();

        assert!(written.starts_with("{\n    \"name\": \"app\",\n    \"version\": \"1.0.0\","));
        assert!(written.ends_with("}\n"));

        let reread = Manifest::read(dir.path()).unwrap();
        assert_eq!(
            reread.dependency(DependencyScope::DevDependencies, "lib"),
            Some("file:.zen/lib@1.2.0")
        );
    }

    #[test]
    fn zen_block_round_trips_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = write_manifest(dir.path(), MANIFEST);

        let mut zen = manifest.zen().unwrap();
        zen.dev_dependencies.insert(
            String::from("tool"),
            ZenDependency {
                version: String::from("*"),
                ..Default::default()
            },
        );
        manifest.set_zen(&zen).unwrap();
        manifest.write().unwrap();

        let zen = Manifest::read(dir.path()).unwrap().zen().unwrap();
        assert_eq!(zen.dev_dependencies["tool"].version, "*");
        assert_eq!(zen.other["custom"], 1);
    }

    #[test]
    fn removes_dependency_everywhere() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = write_manifest(dir.path(), MANIFEST);

        manifest.set_dependency(DependencyScope::PeerDependencies, "left-pad", "*");

        assert!(manifest.remove_dependency_everywhere("left-pad"));
        assert!(!manifest.remove_dependency_everywhere("left-pad"));
        assert_eq!(manifest.dependency(DependencyScope::Dependencies, "left-pad"), None);
        assert!(manifest.has_scope(DependencyScope::PeerDependencies));

        let mut zen = manifest.zen().unwrap();
        assert!(zen.remove_everywhere("lib"));
        assert!(zen.dependencies.is_empty());
    }
}
